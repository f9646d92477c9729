//! Upstream profile sources and the parsing helpers they share.
//!
//! A source turns one player identifier into a canonical [`PlayerProfile`].
//! It reports hard failures (player missing, rate limited, transport down) as
//! `Err`; the profile store decides what to cache.

pub mod faceit;
pub mod leetify;

use crate::api::client::HttpResponse;
use crate::error::AppError;
use crate::profile::PlayerProfile;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

pub use faceit::FaceitSource;
pub use leetify::LeetifySource;

#[async_trait]
pub trait ProfileSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_profile(&self, id: &str) -> Result<PlayerProfile, AppError>;
}

/// Reads a number that may arrive as a JSON number or a numeric string.
/// Missing, null and unparsable values are `None`; `0` stays `Some(0.0)`.
pub fn parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Like [`parse_f64`] for counters. Fractions are truncated, negatives rejected.
pub fn parse_u32(value: &Value) -> Option<u32> {
    parse_f64(value)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.trunc() as u32)
}

pub fn field_f64(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(parse_f64)
}

pub fn field_u32(map: &Map<String, Value>, key: &str) -> Option<u32> {
    map.get(key).and_then(parse_u32)
}

/// Decodes a secondary endpoint's response. Any failure degrades to `None`
/// with a warning instead of failing the whole profile.
pub(crate) fn secondary<T: DeserializeOwned>(
    response: Result<HttpResponse, AppError>,
    endpoint: &str,
    id: &str,
) -> Option<T> {
    match response {
        Ok(resp) if resp.is_success() => match resp.json::<T>() {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(player = %id, endpoint, error = %e, "secondary payload unreadable, fields left empty");
                None
            }
        },
        Ok(resp) => {
            warn!(player = %id, endpoint, status = resp.status, "secondary call failed, fields left empty");
            None
        }
        Err(e) => {
            warn!(player = %id, endpoint, error = %e, "secondary call failed, fields left empty");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_f64_accepts_numbers_and_strings() {
        assert_eq!(parse_f64(&json!(1.25)), Some(1.25));
        assert_eq!(parse_f64(&json!("52")), Some(52.0));
        assert_eq!(parse_f64(&json!(" 0.87 ")), Some(0.87));
    }

    #[test]
    fn test_parse_f64_keeps_zero_distinct_from_absent() {
        assert_eq!(parse_f64(&json!(0)), Some(0.0));
        assert_eq!(parse_f64(&json!("0")), Some(0.0));
        assert_eq!(parse_f64(&Value::Null), None);
        assert_eq!(parse_f64(&json!("")), None);
        assert_eq!(parse_f64(&json!("n/a")), None);
        assert_eq!(parse_f64(&json!({"value": 3})), None);
    }

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32(&json!("12")), Some(12));
        assert_eq!(parse_u32(&json!(7.9)), Some(7));
        assert_eq!(parse_u32(&json!(-1)), None);
        assert_eq!(parse_u32(&json!("x")), None);
    }

    #[test]
    fn test_secondary_degrades() {
        let bad_status = Ok(HttpResponse { status: 503, body: String::new() });
        assert!(secondary::<Value>(bad_status, "stats", "p1").is_none());

        let transport = Err(AppError::HttpError("reset".into()));
        assert!(secondary::<Value>(transport, "stats", "p1").is_none());

        let good = Ok(HttpResponse { status: 200, body: "{\"a\":1}".into() });
        assert_eq!(secondary::<Value>(good, "stats", "p1"), Some(json!({"a": 1})));
    }
}
