// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Redacted summary reports from intercepted HTTP and WebSocket traffic.
//!
//! This library provides the capture decoder, redaction, HTTP and WebSocket
//! correlation, report rendering, and the pipeline that ties them together.

pub mod capture;
pub mod config;
pub mod http_correlator;
pub mod pipeline;
pub mod redact;
pub mod report;
pub mod serde_helpers;
pub mod ws_correlator;

// Keep library small; main.rs remains the binary entrypoint.
