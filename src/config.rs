// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Configuration loading for input/output paths and report limits.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Path of the JSONL capture to analyze
    #[serde(default = "default_input")]
    pub input: String,

    /// Path the rendered report is written to
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_input() -> String {
    "tmp/ha_traffic.jsonl".to_string()
}

fn default_output() -> String {
    "tmp/parsed_proxy_output.txt".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Character limit for rendered HTTP bodies
    #[serde(default = "default_http_body_limit")]
    pub http_body_limit: usize,

    /// Character limit for each WebSocket message type sample
    #[serde(default = "default_ws_sample_limit")]
    pub ws_sample_limit: usize,

    /// Character limit for each side of a matched WebSocket pair
    #[serde(default = "default_ws_pair_limit")]
    pub ws_pair_limit: usize,

    /// Samples retained per WebSocket message type
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Matched pairs rendered per request type
    #[serde(default = "default_max_pairs_shown")]
    pub max_pairs_shown: usize,

    /// Distinct request shapes retained per path; unbounded when absent
    #[serde(default)]
    pub max_examples_per_path: Option<usize>,
}

fn default_http_body_limit() -> usize {
    1000
}

fn default_ws_sample_limit() -> usize {
    800
}

fn default_ws_pair_limit() -> usize {
    600
}

fn default_max_samples() -> usize {
    3
}

fn default_max_pairs_shown() -> usize {
    2
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            http_body_limit: default_http_body_limit(),
            ws_sample_limit: default_ws_sample_limit(),
            ws_pair_limit: default_ws_pair_limit(),
            max_samples: default_max_samples(),
            max_pairs_shown: default_max_pairs_shown(),
            max_examples_per_path: None,
        }
    }
}

impl ReportConfig {
    /// Reject limits that would produce an empty report section.
    pub fn validate(&self) -> anyhow::Result<()> {
        let limits = [
            ("http_body_limit", Some(self.http_body_limit)),
            ("ws_sample_limit", Some(self.ws_sample_limit)),
            ("ws_pair_limit", Some(self.ws_pair_limit)),
            ("max_samples", Some(self.max_samples)),
            ("max_pairs_shown", Some(self.max_pairs_shown)),
            ("max_examples_per_path", self.max_examples_per_path),
        ];
        for (key, value) in limits {
            if value == Some(0) {
                anyhow::bail!("Invalid '{}' in [report]: must be greater than zero", key);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Every key is optional:
    ///
    /// [general]
    /// input = "tmp/ha_traffic.jsonl"
    /// output = "tmp/parsed_proxy_output.txt"
    ///
    /// [report]
    /// http_body_limit = 1000
    /// max_examples_per_path = 20
    pub async fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let s = tokio::fs::read_to_string(path_ref).await?;
        let cfg: Self = toml::from_str(&s)?;
        cfg.report.validate()?;
        Ok(cfg)
    }
}
