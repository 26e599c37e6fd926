// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! WebSocket message statistics and id-based request/response matching.
//!
//! Every structured message counts toward its type's statistics. Only
//! messages carrying an `id` take part in pairing: a server message is
//! matched against the latest client message recorded under the same id.

use std::collections::{BTreeMap, HashMap};

use crate::capture::{Direction, WebSocketEvent};

/// Message type used when a payload has no string `type` field.
pub const UNKNOWN_TYPE: &str = "unknown";

/// A WebSocket frame whose text content is a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct WsMessage {
    pub message_type: String,
    /// JSON text of the `id` field, so `1` and `"1"` stay distinct.
    pub correlation_id: Option<String>,
    /// `None` when the capture recorded no usable direction.
    pub direction: Option<Direction>,
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl WsMessage {
    /// Parse frame content. Returns `None` unless it is a JSON object.
    pub fn parse(direction: Option<Direction>, content: &str) -> Option<Self> {
        let raw = match serde_json::from_str::<serde_json::Value>(content) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => return None,
        };
        let message_type = raw
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or(UNKNOWN_TYPE)
            .to_string();
        let correlation_id = raw
            .get("id")
            .filter(|id| !id.is_null())
            .map(|id| id.to_string());
        Some(Self {
            message_type,
            correlation_id,
            direction,
            raw,
        })
    }

    pub fn from_event(event: &WebSocketEvent) -> Option<Self> {
        Self::parse(event.direction, event.text()?)
    }
}

/// Statistics for one message type.
#[derive(Debug, Clone, Default)]
pub struct MessageTypeGroup {
    count: usize,
    samples: Vec<WsMessage>,
}

impl MessageTypeGroup {
    pub fn count(&self) -> usize {
        self.count
    }

    /// The first messages seen of this type, in input order.
    pub fn samples(&self) -> &[WsMessage] {
        &self.samples
    }

    /// Heuristic: a type looks client-originated if any retained sample
    /// carries a correlation id.
    pub fn looks_client_originated(&self) -> bool {
        self.samples.iter().any(|m| m.correlation_id.is_some())
    }
}

/// A client message and the server message that answered it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub request: WsMessage,
    pub response: WsMessage,
}

/// Latest message per correlation id and direction, plus the pairs matched so far.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    client: HashMap<String, WsMessage>,
    server: HashMap<String, WsMessage>,
    pairs: Vec<MatchedPair>,
}

impl CorrelationTable {
    /// Record a message carrying a correlation id.
    ///
    /// A server message whose id was already seen from the client appends a
    /// pair. Pairs are never revisited, so a re-used id can match again.
    /// Messages without a direction are ignored.
    pub fn record(&mut self, id: &str, msg: &WsMessage) {
        let Some(direction) = msg.direction else {
            return;
        };
        match direction {
            Direction::Client => {
                self.client.insert(id.to_string(), msg.clone());
            }
            Direction::Server => {
                self.server.insert(id.to_string(), msg.clone());
                if let Some(request) = self.client.get(id) {
                    self.pairs.push(MatchedPair {
                        request: request.clone(),
                        response: msg.clone(),
                    });
                }
            }
        }
    }

    pub fn latest(&self, direction: Direction, id: &str) -> Option<&WsMessage> {
        match direction {
            Direction::Client => self.client.get(id),
            Direction::Server => self.server.get(id),
        }
    }

    /// Matched pairs in match order.
    pub fn pairs(&self) -> &[MatchedPair] {
        &self.pairs
    }
}

/// Accumulates per-type statistics and the correlation table.
#[derive(Debug)]
pub struct WsCorrelator {
    types: BTreeMap<String, MessageTypeGroup>,
    table: CorrelationTable,
    max_samples: usize,
    events: usize,
    unstructured: usize,
}

impl Default for WsCorrelator {
    fn default() -> Self {
        Self::new(3)
    }
}

impl WsCorrelator {
    pub fn new(max_samples: usize) -> Self {
        Self {
            types: BTreeMap::new(),
            table: CorrelationTable::default(),
            max_samples,
            events: 0,
            unstructured: 0,
        }
    }

    /// Fold one frame into the statistics and, if it has an id, the table.
    pub fn observe(&mut self, event: &WebSocketEvent) {
        self.events += 1;
        let Some(msg) = WsMessage::from_event(event) else {
            self.unstructured += 1;
            return;
        };

        let group = self.types.entry(msg.message_type.clone()).or_default();
        group.count += 1;
        if group.samples.len() < self.max_samples {
            group.samples.push(msg.clone());
        }

        if let Some(id) = msg.correlation_id.as_deref() {
            self.table.record(id, &msg);
        }
    }

    /// Message types in lexicographic order.
    pub fn types(&self) -> impl Iterator<Item = (&str, &MessageTypeGroup)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, message_type: &str) -> Option<&MessageTypeGroup> {
        self.types.get(message_type)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn table(&self) -> &CorrelationTable {
        &self.table
    }

    pub fn pairs(&self) -> &[MatchedPair] {
        self.table.pairs()
    }

    /// Matched pairs grouped by the request's message type, lexicographically.
    pub fn pairs_by_request_type(&self) -> BTreeMap<&str, Vec<&MatchedPair>> {
        let mut out: BTreeMap<&str, Vec<&MatchedPair>> = BTreeMap::new();
        for pair in self.table.pairs() {
            out.entry(pair.request.message_type.as_str())
                .or_default()
                .push(pair);
        }
        out
    }

    /// Frames observed, structured or not.
    pub fn event_count(&self) -> usize {
        self.events
    }

    /// Frames that were binary, empty, or not a JSON object.
    pub fn unstructured_count(&self) -> usize {
        self.unstructured
    }
}
