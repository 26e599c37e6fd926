// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

#![allow(dead_code)]

use std::path::PathBuf;

use traffic_report::capture::{Direction, HttpEvent, LogRecord, WebSocketEvent};
use traffic_report::config::Config;

/// Fresh scratch directory under the system temp dir.
pub fn make_temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}_{}", prefix, uuid::Uuid::new_v4()))
}

/// Config reading `<dir>/capture.jsonl` and writing `<dir>/out/report.txt`.
pub fn make_config(dir: &std::path::Path) -> Config {
    let mut cfg = Config::default();
    cfg.general.input = dir.join("capture.jsonl").to_string_lossy().into_owned();
    cfg.general.output = dir
        .join("out")
        .join("report.txt")
        .to_string_lossy()
        .into_owned();
    cfg
}

pub fn http(method: &str, url: &str, body: Option<&str>, status: u16) -> LogRecord {
    LogRecord::Http(HttpEvent {
        timestamp: Some(1_700_000_000.0),
        method: method.to_string(),
        url: url.to_string(),
        request_body: body.map(str::to_string),
        status_code: status,
        ..HttpEvent::default()
    })
}

pub fn ws(direction: Direction, content: &str) -> LogRecord {
    LogRecord::WebSocket(WebSocketEvent {
        timestamp: Some(1_700_000_001.0),
        url: "ws://hass.local:8123/api/websocket".to_string(),
        direction: Some(direction),
        content: Some(content.to_string()),
    })
}

/// Serialize records the way the capture side writes them.
pub fn to_jsonl(records: &[LogRecord]) -> anyhow::Result<String> {
    let mut out = String::new();
    for r in records {
        out.push_str(&serde_json::to_string(r)?);
        out.push('\n');
    }
    Ok(out)
}
