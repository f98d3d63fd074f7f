//! Application-level `{code, message, data}` response envelopes.
//!
//! Backends wrap payloads in an envelope whose `code` is independent of the
//! transport status, so a 200 response may still be a failure. Payloads that
//! are not shaped like an envelope pass through untouched, which lets the
//! same client talk to endpoints that return bare JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Error;

const FALLBACK_MESSAGE: &str = "request failed";

/// Set of envelope codes treated as success. Defaults to `{200}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkCodes(Vec<i64>);

impl OkCodes {
    pub fn new(codes: impl IntoIterator<Item = i64>) -> Self {
        Self(codes.into_iter().collect())
    }

    pub fn contains(&self, code: i64) -> bool {
        self.0.contains(&code)
    }
}

impl Default for OkCodes {
    fn default() -> Self {
        Self(vec![200])
    }
}

impl From<i64> for OkCodes {
    fn from(code: i64) -> Self {
        Self(vec![code])
    }
}

impl From<Vec<i64>> for OkCodes {
    fn from(codes: Vec<i64>) -> Self {
        Self(codes)
    }
}

impl<const N: usize> From<[i64; N]> for OkCodes {
    fn from(codes: [i64; N]) -> Self {
        Self(codes.to_vec())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    pub fn into_result(self, ok_codes: &OkCodes) -> Result<Option<T>, Error> {
        if ok_codes.contains(self.code) {
            Ok(self.data)
        } else {
            Err(rejection(self.code, Some(&self.message)))
        }
    }
}

/// Return the envelope's `data` if its code is acceptable.
///
/// Non-envelope payloads are returned unchanged. A rejected envelope becomes
/// [`Error::Validation`], carrying an HTTP-equivalent status when the code
/// falls in 100..=599.
pub fn unwrap_envelope(payload: Value, ok_codes: &OkCodes) -> Result<Value, Error> {
    let Value::Object(mut map) = payload else {
        return Ok(payload);
    };
    let Some(code) = envelope_code(&map) else {
        return Ok(Value::Object(map));
    };
    if ok_codes.contains(code) {
        return Ok(map.remove("data").unwrap_or(Value::Null));
    }
    Err(rejection(code, map.get("message").and_then(Value::as_str)))
}

/// [`unwrap_envelope`] followed by deserialization into `T`.
pub fn unwrap_as<T: DeserializeOwned>(payload: Value, ok_codes: &OkCodes) -> Result<T, Error> {
    let data = unwrap_envelope(payload, ok_codes)?;
    Ok(serde_json::from_value(data)?)
}

/// An object is an envelope when it has an integer `code` next to a
/// `message` or `data` field.
fn envelope_code(map: &Map<String, Value>) -> Option<i64> {
    let code = map.get("code")?.as_i64()?;
    (map.contains_key("message") || map.contains_key("data")).then_some(code)
}

fn rejection(code: i64, message: Option<&str>) -> Error {
    let message = message
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_MESSAGE)
        .to_string();
    let status = (100..=599).contains(&code).then_some(code as u16);
    Error::Validation {
        code,
        status,
        message,
    }
}
