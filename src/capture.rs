// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Decoding of intercepted traffic records from JSONL captures.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::serde_helpers::{self, Headers};

/// Value of the `type` field that marks a WebSocket record.
pub const WEBSOCKET_MARKER: &str = "websocket";

/// Content placeholder the capture side writes for binary frames.
pub const BINARY_SENTINEL: &str = "<binary>";

/// One captured HTTP request/response exchange.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct HttpEvent {
    pub timestamp: Option<f64>,
    #[serde(deserialize_with = "serde_helpers::deserialize_lenient_string")]
    pub method: String,
    #[serde(deserialize_with = "serde_helpers::deserialize_lenient_string")]
    pub url: String,
    #[serde(
        serialize_with = "serde_helpers::serialize_headers",
        deserialize_with = "serde_helpers::deserialize_headers"
    )]
    pub request_headers: Headers,
    #[serde(deserialize_with = "serde_helpers::deserialize_body")]
    pub request_body: Option<String>,
    #[serde(deserialize_with = "serde_helpers::deserialize_or_default")]
    pub status_code: u16,
    #[serde(
        serialize_with = "serde_helpers::serialize_headers",
        deserialize_with = "serde_helpers::deserialize_headers"
    )]
    pub response_headers: Headers,
    #[serde(deserialize_with = "serde_helpers::deserialize_body")]
    pub response_body: Option<String>,
}

/// Which peer sent a WebSocket frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Client,
    Server,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Client => f.write_str("client"),
            Direction::Server => f.write_str("server"),
        }
    }
}

/// One captured WebSocket frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WebSocketEvent {
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_lenient_string")]
    pub url: String,
    /// `None` when the record has no usable direction; such frames still
    /// count toward statistics but never pair.
    #[serde(default, deserialize_with = "serde_helpers::deserialize_or_default")]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub content: Option<String>,
}

impl WebSocketEvent {
    /// Text content of the frame, or `None` for absent or binary frames.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|c| *c != BINARY_SENTINEL)
    }
}

/// A decoded capture line.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Http(HttpEvent),
    WebSocket(WebSocketEvent),
}

impl LogRecord {
    pub fn timestamp(&self) -> Option<f64> {
        match self {
            LogRecord::Http(ev) => ev.timestamp,
            LogRecord::WebSocket(ev) => ev.timestamp,
        }
    }
}

impl Serialize for LogRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Tagged<'a> {
            r#type: &'static str,
            #[serde(flatten)]
            event: &'a WebSocketEvent,
        }

        match self {
            LogRecord::Http(ev) => ev.serialize(serializer),
            LogRecord::WebSocket(ev) => Tagged {
                r#type: WEBSOCKET_MARKER,
                event: ev,
            }
            .serialize(serializer),
        }
    }
}

/// Why a single capture line could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// A decode failure pinned to its 1-based line number.
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {error}")]
pub struct LineDecodeError {
    pub line: usize,
    #[source]
    pub error: DecodeError,
}

/// Decode one capture line.
///
/// Blank lines yield `Ok(None)`. Records carrying `"type": "websocket"` are
/// WebSocket frames; everything else is read as an HTTP exchange with
/// missing fields defaulted.
pub fn decode_line(line: &str) -> Result<Option<LogRecord>, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(line)?;
    let kind = match &value {
        serde_json::Value::Object(_) => None,
        serde_json::Value::Array(_) => Some("an array"),
        serde_json::Value::String(_) => Some("a string"),
        serde_json::Value::Number(_) => Some("a number"),
        serde_json::Value::Bool(_) => Some("a boolean"),
        serde_json::Value::Null => Some("null"),
    };
    if let Some(kind) = kind {
        return Err(DecodeError::NotAnObject(kind));
    }

    let is_websocket = value.get("type").and_then(|t| t.as_str()) == Some(WEBSOCKET_MARKER);
    let record = if is_websocket {
        LogRecord::WebSocket(serde_json::from_value(value)?)
    } else {
        LogRecord::Http(serde_json::from_value(value)?)
    };
    Ok(Some(record))
}

/// Records decoded from a capture plus the lines that had to be skipped.
#[derive(Debug, Default)]
pub struct DecodedCaptures {
    pub records: Vec<LogRecord>,
    pub failures: Vec<LineDecodeError>,
}

/// Decode a whole JSONL capture.
///
/// Malformed lines are skipped with a warning logged.
pub fn decode_captures(text: &str) -> DecodedCaptures {
    let mut out = DecodedCaptures::default();

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        match decode_line(line) {
            Ok(Some(record)) => out.records.push(record),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(line = line_num, error = %e, "failed to parse capture record, skipping");
                out.failures.push(LineDecodeError {
                    line: line_num,
                    error: e,
                });
            }
        }
    }

    out
}

/// Load and decode a JSONL capture file.
///
/// The whole file is read before decoding starts.
pub async fn load_captures<P: AsRef<std::path::Path>>(
    path: P,
) -> std::io::Result<DecodedCaptures> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(decode_captures(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tokio::fs;
    use uuid::Uuid;

    #[test]
    fn decode_http_record() -> anyhow::Result<()> {
        let line = r#"{"timestamp":1.5,"method":"POST","url":"http://hass:8123/auth/token","request_headers":{"Content-Type":"application/x-www-form-urlencoded"},"request_body":"grant_type=password","status_code":200,"response_headers":{},"response_body":"{\"ok\":true}"}"#;
        let rec = decode_line(line)?.expect("record");
        match rec {
            LogRecord::Http(ev) => {
                assert_eq!(ev.method, "POST");
                assert_eq!(ev.url, "http://hass:8123/auth/token");
                assert_eq!(ev.status_code, 200);
                assert_eq!(ev.request_headers.len(), 1);
                assert_eq!(ev.request_body.as_deref(), Some("grant_type=password"));
                assert_eq!(ev.timestamp, Some(1.5));
            }
            other => panic!("unexpected record {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn decode_http_defaults_missing_fields() -> anyhow::Result<()> {
        let rec = decode_line(r#"{"url":"http://x/","request_body":null}"#)?.expect("record");
        assert_eq!(
            rec,
            LogRecord::Http(HttpEvent {
                url: "http://x/".into(),
                ..HttpEvent::default()
            })
        );
        Ok(())
    }

    #[test]
    fn decode_websocket_record() -> anyhow::Result<()> {
        let line = r#"{"timestamp":2.0,"type":"websocket","url":"ws://hass/api/websocket","direction":"client","content":"{\"type\":\"ping\",\"id\":1}"}"#;
        match decode_line(line)?.expect("record") {
            LogRecord::WebSocket(ev) => {
                assert_eq!(ev.direction, Some(Direction::Client));
                assert_eq!(ev.text(), Some(r#"{"type":"ping","id":1}"#));
            }
            other => panic!("unexpected record {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn binary_frames_have_no_text() -> anyhow::Result<()> {
        let line = r#"{"type":"websocket","url":"ws://h/","direction":"server","content":"<binary>"}"#;
        match decode_line(line)?.expect("record") {
            LogRecord::WebSocket(ev) => assert_eq!(ev.text(), None),
            other => panic!("unexpected record {other:?}"),
        }
        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\r")]
    fn blank_lines_are_skipped(#[case] line: &str) -> anyhow::Result<()> {
        assert!(decode_line(line)?.is_none());
        Ok(())
    }

    #[rstest]
    #[case("not json")]
    #[case("[1,2,3]")]
    #[case("42")]
    #[case(r#"{"type":"websocket","content":{"nested":true}}"#)]
    #[case(r#"{"method":"GET","headers_only":1,"request_headers":[1]}"#)]
    fn undecodable_lines_error(#[case] line: &str) {
        assert!(decode_line(line).is_err());
    }

    #[rstest]
    #[case(r#"{"type":"websocket","url":"ws://h/","content":"{\"type\":\"ping\"}"}"#, None)]
    #[case(r#"{"type":"websocket","direction":null,"content":"{}"}"#, None)]
    #[case(r#"{"type":"websocket","direction":"sideways","content":"{}"}"#, None)]
    #[case(r#"{"type":"websocket","direction":"server"}"#, Some(Direction::Server))]
    fn websocket_direction_defaults(
        #[case] line: &str,
        #[case] expected: Option<Direction>,
    ) -> anyhow::Result<()> {
        match decode_line(line)?.expect("record") {
            LogRecord::WebSocket(ev) => assert_eq!(ev.direction, expected),
            other => panic!("unexpected record {other:?}"),
        }
        Ok(())
    }

    #[rstest]
    #[case(r#"{"method":"GET","url":"http://x/","status_code":null}"#)]
    #[case(r#"{"method":"GET","url":"http://x/","status_code":"ok"}"#)]
    #[case(r#"{"method":null,"url":null,"request_headers":null,"response_body":null}"#)]
    fn http_null_or_mistyped_fields_default(#[case] line: &str) -> anyhow::Result<()> {
        match decode_line(line)?.expect("record") {
            LogRecord::Http(ev) => {
                assert_eq!(ev.status_code, 0);
                assert!(ev.request_headers.is_empty());
                assert!(ev.response_body.is_none());
            }
            other => panic!("unexpected record {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn websocket_serializes_with_marker() -> anyhow::Result<()> {
        let rec = LogRecord::WebSocket(WebSocketEvent {
            timestamp: None,
            url: "ws://h/".into(),
            direction: Some(Direction::Server),
            content: Some("{}".into()),
        });
        let line = serde_json::to_string(&rec)?;
        assert_eq!(decode_line(&line)?, Some(rec));
        assert!(line.contains(r#""type":"websocket""#));
        Ok(())
    }

    #[test]
    fn decode_captures_reports_line_numbers() {
        let text = "{\"url\":\"http://x/a\"}\n\nnot json\n{\"url\":\"http://x/b\"}\n";
        let decoded = decode_captures(text);
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.failures.len(), 1);
        assert_eq!(decoded.failures[0].line, 3);
        assert!(decoded.failures[0].to_string().starts_with("line 3:"));
    }

    #[tokio::test]
    async fn load_captures_reads_file() -> anyhow::Result<()> {
        let tmp =
            std::env::temp_dir().join(format!("traffic_load_test_{}.jsonl", Uuid::new_v4()));
        fs::write(&tmp, "{\"method\":\"GET\",\"url\":\"http://x/\"}\n").await?;

        let decoded = load_captures(&tmp).await?;
        assert_eq!(decoded.records.len(), 1);
        assert!(decoded.failures.is_empty());

        fs::remove_file(&tmp).await?;
        Ok(())
    }

    #[tokio::test]
    async fn load_captures_missing_file_errors() {
        let tmp = std::env::temp_dir().join(format!("traffic_missing_{}.jsonl", Uuid::new_v4()));
        assert!(load_captures(&tmp).await.is_err());
    }
}
