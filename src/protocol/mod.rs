//! Wire types for the Deezer services deezload talks to.
//!
//! # Submodules
//!
//! * [`gateway`] - internal, session-authenticated API (`gw-light.php`)
//! * [`public`] - public, unauthenticated REST API (`api.deezer.com`)
//! * [`media`] - media URL resolution (`media.deezer.com`)
//!
//! Deezer is inconsistent in how it encodes numbers: the same field can be a
//! JSON number in one response and a numeric string in the next. Typed
//! fields use `serde_with::PickFirst` for this; untyped lookups go through
//! [`lenient_u64`].

pub mod gateway;
pub mod media;
pub mod public;

use std::fmt::Debug;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

/// Parses and logs a JSON response body.
///
/// * Success: logs the parsed structure at TRACE level
/// * Parse error on valid JSON: logs the raw JSON at TRACE level
/// * Invalid JSON: logs the error at DEBUG level and the body at TRACE level
///
/// # Errors
///
/// Returns an error if `body` does not deserialize into `T`.
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<Value>(body) {
                trace!("{origin}: {json:#?}");
            } else {
                debug!("{origin}: failed parsing response ({e})");
                trace!("{body}");
            }
            Err(e.into())
        }
    }
}

/// Reads an unsigned integer that may be encoded as a number or a string.
#[must_use]
pub fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(string) => string.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_numbers() {
        assert_eq!(lenient_u64(&json!(42)), Some(42));
        assert_eq!(lenient_u64(&json!("42")), Some(42));
        assert_eq!(lenient_u64(&json!(-1)), None);
        assert_eq!(lenient_u64(&json!("n/a")), None);
        assert_eq!(lenient_u64(&json!(null)), None);
    }

    #[test]
    fn json_reports_mismatch() {
        let parsed: Result<u64> = json("{\"a\": 1}", "test");
        assert!(parsed.is_err());
        let parsed: Result<Value> = json("{\"a\": 1}", "test");
        assert_eq!(parsed.unwrap(), json!({ "a": 1 }));
    }
}
