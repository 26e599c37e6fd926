// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Plain-text report rendering.
//!
//! The report has four sections, always in the same order: HTTP endpoints,
//! WebSocket message types, WebSocket request/response pairs, and a summary.
//! Every map is iterated in sorted order so the same capture always renders
//! byte-identical output.

use std::fmt::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::ReportConfig;
use crate::http_correlator::{EndpointGroup, Example};
use crate::pipeline::Analysis;
use crate::redact::redact_body;
use crate::serde_helpers::Headers;
use crate::ws_correlator::{MatchedPair, WsMessage};

const DIVIDER_WIDTH: usize = 80;

/// Appended to text cut at its section's limit.
pub const TRUNCATION_SUFFIX: &str = "\n... (truncated)";

/// Message types the server sends on its own initiative or in reply.
pub const KNOWN_SERVER_TYPES: &[&str] = &[
    "auth_required",
    "auth_ok",
    "auth_invalid",
    "result",
    "event",
    "pong",
];

/// Cut `text` to `limit` characters, marking the cut.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATION_SUFFIX),
        None => text.to_string(),
    }
}

/// Pretty-print `body` when it is JSON, redact, then truncate.
///
/// Bodies that do not parse are rendered as raw text.
pub fn render_body(body: &str, limit: usize) -> String {
    let text = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    };
    truncate(&redact_body(&text), limit)
}

fn render_message(msg: &WsMessage, limit: usize) -> String {
    let text = serde_json::to_string_pretty(&msg.raw)
        .unwrap_or_else(|_| serde_json::Value::Object(msg.raw.clone()).to_string());
    truncate(&redact_body(&text), limit)
}

fn format_timestamp(ts: f64) -> Option<String> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.floor();
    let nanos = ((ts - secs) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Render the full report.
pub fn render(analysis: &Analysis, cfg: &ReportConfig) -> Result<String, fmt::Error> {
    let mut out = String::new();
    render_http_section(&mut out, analysis, cfg)?;
    render_types_section(&mut out, analysis, cfg)?;
    render_pairs_section(&mut out, analysis, cfg)?;
    render_summary_section(&mut out, analysis)?;
    Ok(out)
}

fn section_header(out: &mut String, title: &str) -> fmt::Result {
    let divider = "=".repeat(DIVIDER_WIDTH);
    writeln!(out, "{divider}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{divider}")?;
    writeln!(out)
}

fn write_headers(out: &mut String, label: &str, headers: &Headers) -> fmt::Result {
    writeln!(out, "{label}:")?;
    if headers.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for (k, v) in headers {
        writeln!(out, "  {k}: {v}")?;
    }
    Ok(())
}

fn write_example(out: &mut String, example: &Example, limit: usize) -> fmt::Result {
    write_headers(out, "Request headers", &example.request.headers)?;
    if let Some(body) = &example.request.body {
        writeln!(out, "Request body:\n{}", render_body(body, limit))?;
    }
    writeln!(out, "Response status: {}", example.response.status)?;
    write_headers(out, "Response headers", &example.response.headers)?;
    if let Some(body) = &example.response.body {
        writeln!(out, "Response body:\n{}", render_body(body, limit))?;
    }
    Ok(())
}

fn write_endpoint(out: &mut String, path: &str, group: &EndpointGroup, limit: usize) -> fmt::Result {
    let methods: Vec<&str> = group.methods().collect();
    writeln!(out, "## {} {}", methods.join(", "), path)?;
    writeln!(out)?;

    let numbered = group.examples().len() > 1;
    for (i, example) in group.examples().iter().enumerate() {
        if numbered {
            writeln!(out, "--- Example {} ---", i + 1)?;
        }
        write_example(out, example, limit)?;
        writeln!(out)?;
    }
    if group.dropped() > 0 {
        writeln!(
            out,
            "({} further request shapes not shown)\n",
            group.dropped()
        )?;
    }
    Ok(())
}

fn render_http_section(out: &mut String, analysis: &Analysis, cfg: &ReportConfig) -> fmt::Result {
    section_header(out, "HTTP ENDPOINTS")?;
    for (path, group) in analysis.http.groups() {
        write_endpoint(out, path, group, cfg.http_body_limit)?;
    }
    Ok(())
}

fn render_types_section(out: &mut String, analysis: &Analysis, cfg: &ReportConfig) -> fmt::Result {
    section_header(out, "WEBSOCKET MESSAGE TYPES")?;
    for (name, group) in analysis.ws.types() {
        writeln!(out, "## {} (count: {})", name, group.count())?;
        writeln!(out)?;
        let numbered = group.samples().len() > 1;
        for (i, sample) in group.samples().iter().enumerate() {
            if numbered {
                writeln!(out, "Sample {}:", i + 1)?;
            }
            writeln!(out, "{}", render_message(sample, cfg.ws_sample_limit))?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_pair(out: &mut String, pair: &MatchedPair, limit: usize) -> fmt::Result {
    writeln!(out, "Request:\n{}", render_message(&pair.request, limit))?;
    writeln!(out, "Response:\n{}", render_message(&pair.response, limit))
}

fn render_pairs_section(out: &mut String, analysis: &Analysis, cfg: &ReportConfig) -> fmt::Result {
    section_header(out, "WEBSOCKET REQUEST/RESPONSE PAIRS")?;
    for (name, pairs) in analysis.ws.pairs_by_request_type() {
        writeln!(out, "## {} (pairs: {})", name, pairs.len())?;
        writeln!(out)?;
        let shown = pairs.len().min(cfg.max_pairs_shown);
        for (i, pair) in pairs.iter().take(shown).enumerate() {
            if shown > 1 {
                writeln!(out, "--- Pair {} ---", i + 1)?;
            }
            write_pair(out, pair, cfg.ws_pair_limit)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn render_summary_section(out: &mut String, analysis: &Analysis) -> fmt::Result {
    section_header(out, "SUMMARY")?;

    writeln!(out, "Total unique endpoints: {}", analysis.http.path_count())?;
    writeln!(out, "Total WebSocket message types: {}", analysis.ws.type_count())?;
    writeln!(out, "Total request/response pairs: {}", analysis.ws.pairs().len())?;
    writeln!(out)?;

    writeln!(out, "Endpoints by method:")?;
    for (method, count) in analysis.http.method_counts() {
        writeln!(out, "  {method}: {count}")?;
    }
    writeln!(out)?;

    writeln!(out, "Client message types:")?;
    for (name, group) in analysis.ws.types() {
        if group.looks_client_originated() {
            writeln!(out, "  - {name}")?;
        }
    }
    writeln!(out)?;

    writeln!(out, "Server message types:")?;
    for (name, _) in analysis.ws.types() {
        if KNOWN_SERVER_TYPES.contains(&name) {
            writeln!(out, "  - {name}")?;
        }
    }
    writeln!(out)?;

    writeln!(out, "Capture statistics:")?;
    writeln!(out, "  HTTP events: {}", analysis.http.event_count())?;
    writeln!(out, "  WebSocket events: {}", analysis.ws.event_count())?;
    writeln!(
        out,
        "  Unstructured WebSocket frames: {}",
        analysis.ws.unstructured_count()
    )?;
    writeln!(out, "  Skipped lines: {}", analysis.skipped_lines)?;
    if analysis.http.dropped_count() > 0 {
        writeln!(
            out,
            "  Request shapes over per-path cap: {}",
            analysis.http.dropped_count()
        )?;
    }
    if let Some((first, last)) = analysis.window {
        if let (Some(first), Some(last)) = (format_timestamp(first), format_timestamp(last)) {
            writeln!(out, "  Capture window: {first} .. {last}")?;
        }
    }
    Ok(())
}
