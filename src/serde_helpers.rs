// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Serde helpers for captured header maps and loosely typed capture fields.

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Header map as captured: original key casing and order preserved.
pub type Headers = Vec<(String, String)>;

pub fn serialize_headers<S>(headers: &Headers, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serde_json::Map::with_capacity(headers.len());
    for (k, v) in headers {
        map.insert(k.clone(), serde_json::Value::String(v.clone()));
    }
    map.serialize(serializer)
}

/// Deserialize a JSON object into ordered header pairs.
///
/// `null` yields an empty map. Non-string values keep their JSON text so a
/// capture with `"content-length": 12` still decodes.
pub fn deserialize_headers<'de, D>(deserializer: D) -> Result<Headers, D::Error>
where
    D: Deserializer<'de>,
{
    struct HeadersVisitor;

    impl<'de> Visitor<'de> for HeadersVisitor {
        type Value = Headers;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a header object or null")
        }

        fn visit_unit<E>(self) -> Result<Headers, E> {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Headers, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut access: A) -> Result<Headers, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((k, v)) = access.next_entry::<String, serde_json::Value>()? {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                out.push((k, value));
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(HeadersVisitor)
}

/// Deserialize an optional body, treating `null` and `""` as absent.
pub fn deserialize_body<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<String>::deserialize(deserializer)?;
    Ok(v.filter(|s| !s.is_empty()))
}

/// Deserialize a string field, treating `null` as empty.
pub fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize any value into `T`, falling back to `T::default()` when the
/// value is `null` or has the wrong shape.
pub fn deserialize_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(v).unwrap_or_default())
}
