//! Failure taxonomy for request execution.

use serde_json::Value;
use thiserror::Error;

/// Payload recorded for an aborted call
pub const REQUEST_ABORTED: &str = "REQUEST_ABORTED";

/// Why a request did not produce a response
///
/// `Aborted` is the cancellation sentinel. It is kept structurally apart from
/// driver failures so the error pipeline can route it to `on_abort` instead
/// of `get_error`/`on_error`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Raw failure reported by a driver (or a rehydrated `ssr_error`)
    #[error("Driver call failed: {0}")]
    Driver(Value),

    /// Error value produced by `get_error` or an `on_error` interceptor
    #[error("Request failed: {0}")]
    Transformed(Value),

    /// The call was cancelled before it settled
    #[error("Request aborted")]
    Aborted,
}

impl RequestError {
    /// Driver failure carrying `payload`
    #[must_use]
    pub fn driver(payload: impl Into<Value>) -> Self {
        Self::Driver(payload.into())
    }

    /// Transformed error carrying `payload`
    #[must_use]
    pub fn transformed(payload: impl Into<Value>) -> Self {
        Self::Transformed(payload.into())
    }

    /// Whether this is the cancellation sentinel
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// The JSON value stored in cache state for this error
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Driver(value) | Self::Transformed(value) => value.clone(),
            Self::Aborted => Value::String(REQUEST_ABORTED.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_of_each_variant() {
        assert_eq!(RequestError::driver(json!({ "status": 500 })).payload(), json!({ "status": 500 }));
        assert_eq!(RequestError::transformed("bad").payload(), json!("bad"));
        assert_eq!(RequestError::Aborted.payload(), json!(REQUEST_ABORTED));
    }

    #[test]
    fn test_only_sentinel_is_aborted() {
        assert!(RequestError::Aborted.is_aborted());
        assert!(!RequestError::driver(REQUEST_ABORTED).is_aborted());
    }
}
