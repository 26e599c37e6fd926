// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Grouping of HTTP exchanges by path with per-shape deduplication.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::capture::HttpEvent;
use crate::redact::{redact_body, redact_headers};
use crate::serde_helpers::Headers;

/// Redacted request side of a retained example.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestExample {
    pub method: String,
    pub headers: Headers,
    pub body: Option<String>,
}

/// Redacted response side of a retained example.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseExample {
    pub status: u16,
    pub headers: Headers,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub request: RequestExample,
    pub response: ResponseExample,
}

/// Dedup key for a request shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Signature {
    method: String,
    body: String,
}

/// Everything observed for one normalized path.
#[derive(Debug, Default, Clone)]
pub struct EndpointGroup {
    methods: BTreeSet<String>,
    signatures: BTreeSet<Signature>,
    examples: Vec<Example>,
    dropped: usize,
}

impl EndpointGroup {
    /// Observed methods, sorted.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }

    /// Retained examples in first-seen order.
    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// Distinct request shapes that were not retained because of the cap.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Method label used when the capture recorded an empty method.
pub const NO_METHOD: &str = "(none)";

static SCHEME_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^/?#]*").expect("valid scheme regex")
});

/// Strip a leading `scheme://host` from `url` and force a leading slash.
///
/// The query string is kept; `http://h` normalizes to `/`. A `://` later
/// in the url, such as inside a query value, is left alone.
pub fn normalize_path(url: &str) -> String {
    let rest = match SCHEME_HOST.find(url) {
        Some(m) => &url[m.end()..],
        None => url,
    };
    if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    }
}

/// Canonical form of a request body used for deduplication.
///
/// JSON bodies are re-serialized with object keys sorted, so reordered keys
/// and whitespace differences collapse to one shape. Other bodies are used
/// verbatim; an absent body is the empty string.
pub fn body_signature(body: Option<&str>) -> String {
    let Some(body) = body else {
        return String::new();
    };
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => canonical_json(&value),
        Err(_) => body.to_string(),
    }
}

fn canonical_json(value: &serde_json::Value) -> String {
    fn sorted(value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                serde_json::Value::Object(
                    entries
                        .into_iter()
                        .map(|(k, v)| (k.clone(), sorted(v)))
                        .collect(),
                )
            }
            serde_json::Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(sorted).collect())
            }
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}

/// Accumulates [`EndpointGroup`]s keyed by normalized path.
#[derive(Debug, Default)]
pub struct HttpCorrelator {
    groups: BTreeMap<String, EndpointGroup>,
    max_examples_per_path: Option<usize>,
    events: usize,
}

impl HttpCorrelator {
    pub fn new(max_examples_per_path: Option<usize>) -> Self {
        Self {
            max_examples_per_path,
            ..Self::default()
        }
    }

    /// Fold one exchange into its path's group.
    pub fn observe(&mut self, event: &HttpEvent) {
        self.events += 1;
        let path = normalize_path(&event.url);
        let method = if event.method.is_empty() {
            NO_METHOD
        } else {
            event.method.as_str()
        };
        let group = self.groups.entry(path).or_default();
        group.methods.insert(method.to_string());

        let sig = Signature {
            method: method.to_string(),
            body: body_signature(event.request_body.as_deref()),
        };
        if group.signatures.contains(&sig) {
            return;
        }

        if let Some(cap) = self.max_examples_per_path {
            if group.examples.len() >= cap {
                group.signatures.insert(sig);
                group.dropped += 1;
                tracing::debug!(url = %event.url, cap, "example cap reached, dropping new request shape");
                return;
            }
        }

        group.signatures.insert(sig);
        group.examples.push(Example {
            request: RequestExample {
                method: method.to_string(),
                headers: redact_headers(&event.request_headers),
                body: event.request_body.as_deref().map(redact_body),
            },
            response: ResponseExample {
                status: event.status_code,
                headers: redact_headers(&event.response_headers),
                body: event.response_body.as_deref().map(redact_body),
            },
        });
    }

    /// Groups in lexicographic path order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &EndpointGroup)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, path: &str) -> Option<&EndpointGroup> {
        self.groups.get(path)
    }

    pub fn path_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of exchanges observed, retained or not.
    pub fn event_count(&self) -> usize {
        self.events
    }

    /// Number of paths on which each method was seen, sorted by method.
    pub fn method_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for group in self.groups.values() {
            for m in group.methods() {
                *counts.entry(m).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Request shapes dropped by the per-path cap across all paths.
    pub fn dropped_count(&self) -> usize {
        self.groups.values().map(|g| g.dropped).sum()
    }
}
