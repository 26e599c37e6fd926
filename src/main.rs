// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use traffic_report::{config, pipeline};

#[derive(Parser, Debug)]
#[command(name = "traffic-report")]
struct Args {
    /// JSONL capture to analyze (overrides config)
    #[arg(long)]
    input: Option<String>,

    /// Report output path (overrides config)
    #[arg(long)]
    output: Option<String>,

    /// Optional config TOML path
    #[arg(long)]
    config: Option<String>,
}

async fn resolve_config(args: &Args) -> config::Config {
    // Load config: optional CLI path; defaults if not provided
    let mut cfg = if let Some(ref p) = args.config {
        config::Config::load_from_path(p).await.unwrap_or_else(|e| {
            warn!(%p, %e, "failed to load config, using defaults");
            config::Config::default()
        })
    } else {
        config::Config::default()
    };
    if let Some(ref input) = args.input {
        cfg.general.input = input.clone();
    }
    if let Some(ref output) = args.output {
        cfg.general.output = output.clone();
    }
    cfg
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let cfg = resolve_config(&args).await;
    let summary = pipeline::run(&cfg).await?;

    println!("Report written to {}", cfg.general.output);
    println!("  Endpoints: {}", summary.endpoints);
    println!("  WebSocket message types: {}", summary.message_types);
    println!("  Request/response pairs: {}", summary.matched_pairs);
    if summary.skipped_lines > 0 {
        println!("  Skipped malformed lines: {}", summary.skipped_lines);
    }

    Ok(())
}
