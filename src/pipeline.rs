// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Decode -> correlate -> render driver.
//!
//! All correlator state lives in an [`Analysis`] owned by a single run, so
//! runs are independent of each other.

use std::path::{Path, PathBuf};

use crate::capture::{self, LogRecord};
use crate::config::{Config, ReportConfig};
use crate::http_correlator::HttpCorrelator;
use crate::report;
use crate::ws_correlator::WsCorrelator;

/// Failures that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("input file not found: {}", path.display())]
    MissingInput { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render report")]
    Render(#[from] std::fmt::Error),
}

/// Knobs for the accumulation step.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub max_samples: usize,
    pub max_examples_per_path: Option<usize>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for AnalysisOptions {
    fn from(cfg: &ReportConfig) -> Self {
        Self {
            max_samples: cfg.max_samples,
            max_examples_per_path: cfg.max_examples_per_path,
        }
    }
}

/// Correlator state accumulated over one capture.
#[derive(Debug)]
pub struct Analysis {
    pub http: HttpCorrelator,
    pub ws: WsCorrelator,
    /// Lines that failed to decode.
    pub skipped_lines: usize,
    /// Earliest and latest event timestamps, in epoch seconds.
    pub window: Option<(f64, f64)>,
}

impl Analysis {
    pub fn new(options: &AnalysisOptions) -> Self {
        Self {
            http: HttpCorrelator::new(options.max_examples_per_path),
            ws: WsCorrelator::new(options.max_samples),
            skipped_lines: 0,
            window: None,
        }
    }

    /// Accumulate `records` in order.
    pub fn from_records<I>(records: I, options: &AnalysisOptions) -> Self
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut analysis = Self::new(options);
        for record in records {
            analysis.observe(&record);
        }
        analysis
    }

    pub fn observe(&mut self, record: &LogRecord) {
        if let Some(ts) = record.timestamp().filter(|t| t.is_finite()) {
            self.window = Some(match self.window {
                Some((first, last)) => (first.min(ts), last.max(ts)),
                None => (ts, ts),
            });
        }
        match record {
            LogRecord::Http(ev) => self.http.observe(ev),
            LogRecord::WebSocket(ev) => self.ws.observe(ev),
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            endpoints: self.http.path_count(),
            message_types: self.ws.type_count(),
            matched_pairs: self.ws.pairs().len(),
            skipped_lines: self.skipped_lines,
        }
    }
}

/// Concise outcome echoed to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub endpoints: usize,
    pub message_types: usize,
    pub matched_pairs: usize,
    pub skipped_lines: usize,
}

/// Decode and accumulate a whole capture held in memory.
pub fn analyze_text(text: &str, options: &AnalysisOptions) -> Analysis {
    let decoded = capture::decode_captures(text);
    let mut analysis = Analysis::from_records(decoded.records, options);
    analysis.skipped_lines = decoded.failures.len();
    analysis
}

/// Write `contents` to `path` through a sibling temp file and a rename.
async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
            tracing::warn!(tmp = %tmp.display(), error = %cleanup, "failed to remove temp file");
        }
        return Err(e);
    }
    Ok(())
}

/// Run the full pipeline for `cfg` and write the report.
pub async fn run(cfg: &Config) -> Result<RunSummary, PipelineError> {
    let input = PathBuf::from(&cfg.general.input);
    let output = PathBuf::from(&cfg.general.output);

    if !tokio::fs::try_exists(&input).await.unwrap_or(false) {
        return Err(PipelineError::MissingInput { path: input });
    }

    let decoded = capture::load_captures(&input)
        .await
        .map_err(|source| PipelineError::Read {
            path: input.clone(),
            source,
        })?;
    tracing::info!(
        records = decoded.records.len(),
        skipped = decoded.failures.len(),
        input = %input.display(),
        "decoded capture"
    );

    let options = AnalysisOptions::from(&cfg.report);
    let mut analysis = Analysis::from_records(decoded.records, &options);
    analysis.skipped_lines = decoded.failures.len();

    let text = report::render(&analysis, &cfg.report)?;
    write_atomic(&output, &text)
        .await
        .map_err(|source| PipelineError::Write {
            path: output.clone(),
            source,
        })?;
    tracing::info!(output = %output.display(), bytes = text.len(), "report written");

    Ok(analysis.summary())
}
