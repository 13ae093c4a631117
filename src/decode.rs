//! Response decoding.
//!
//! The history server answers some lookups for evicted applications with
//! HTTP 200 and a plain-text body, so sentinel phrases are checked before
//! any JSON parsing.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Plain-text phrases meaning "this application is not in history".
pub const MISSING_APP_SENTINELS: [&str; 2] = ["unknown app:", "no such app:"];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("history server reports the application as unknown at {url}")]
    SoftNotFound { url: String },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Stateless JSON decoder shared by all fetchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder;

impl ResponseDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode `raw` (fetched from `url`) into `T`.
    pub fn decode<T: DeserializeOwned>(&self, raw: &str, url: &str) -> Result<T, DecodeError> {
        if MISSING_APP_SENTINELS.iter().any(|s| raw.contains(s)) {
            return Err(DecodeError::SoftNotFound {
                url: url.to_string(),
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| DecodeError::Malformed {
                url: url.to_string(),
                reason: format!("not well-formed JSON: {}", e),
            })?;

        serde_json::from_value(value).map_err(|e| DecodeError::Malformed {
            url: url.to_string(),
            reason: format!("unexpected shape: {}", e),
        })
    }
}

/// Serde adapter for the history server's `2015-02-03T16:42:59.720GMT` timestamps.
///
/// Always UTC; the local timezone is never consulted.
pub mod history_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fGMT";

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, FORMAT).map(|n| n.and_utc())
    }

    pub fn format(t: &DateTime<Utc>) -> String {
        t.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(t: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_some(&super::format(t)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
