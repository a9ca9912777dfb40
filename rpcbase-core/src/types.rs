//! JSON-RPC 2.0 wire types and dispatch outcomes
//!
//! This module holds the data structures that cross the engine boundary:
//!
//! - **Id**: request identifier, echoed verbatim into the response
//! - **JsonRpcResponse**: the `{jsonrpc, result|error, id}` reply object
//! - **RequestEnvelope**: a candidate that passed structural validation
//! - **Outcome**: the result of processing one candidate (one per batch slot)
//!
//! # Request IDs
//!
//! The protocol allows string, number or null ids. Numbers are kept as
//! `serde_json::Number` so that floats and integers beyond `i64` come back
//! exactly as they were sent.
//!
//! # Calls and Notifications
//!
//! A request object carrying an `id` member (even `"id": null`) is a call and
//! gets exactly one response. One without the member is a notification.

use crate::error::JsonRpcErrorData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// JSON-RPC protocol version string carried by every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request ID
///
/// The request identifier correlates a request with its response. It can be
/// a string, a number or null.
///
/// This enum uses `#[serde(untagged)]` to serialize directly as the inner
/// value, matching the wire format exactly.
///
/// # Examples
///
/// ```rust
/// use rpcbase_core::Id;
///
/// let id1: Id = "req-123".into();
/// let id2: Id = 42i64.into();
///
/// assert_eq!(id1.to_string(), "\"req-123\"");
/// assert_eq!(id2.to_string(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier
    String(String),
    /// Numeric identifier, integer or float
    Number(Number),
    /// Explicit null identifier
    Null,
}

impl Id {
    /// Interpret a JSON value as an id
    ///
    /// Returns `None` for booleans, arrays and objects, which are not
    /// permitted as ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Id::String(s.clone())),
            Value::Number(n) => Some(Id::Number(n.clone())),
            Value::Null => Some(Id::Null),
            _ => None,
        }
    }

    /// Whether this is the null id
    pub fn is_null(&self) -> bool {
        matches!(self, Id::Null)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<Id> for Value {
    fn from(id: Id) -> Self {
        match id {
            Id::String(s) => Value::String(s),
            Id::Number(n) => Value::Number(n),
            Id::Null => Value::Null,
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n.into())
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Id::Number(n.into())
    }
}

/// JSON-RPC 2.0 response message
///
/// A response contains either a result or an error, never both. The factory
/// methods enforce this by construction.
///
/// If the request id could not be determined the response carries
/// `Id::Null`.
///
/// # Examples
///
/// ```rust
/// use rpcbase_core::{Id, JsonRpcErrorData, JsonRpcResponse};
/// use serde_json::json;
///
/// let success = JsonRpcResponse::success(json!(5), Id::from(1i64));
/// assert!(success.is_success());
///
/// let error = JsonRpcResponse::error(JsonRpcErrorData::method_not_found("nope", vec![]), Id::Null);
/// assert!(error.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version - always "2.0"
    pub jsonrpc: String,
    /// Result of the invocation, present only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error information, present only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
    /// Id of the request this answers
    pub id: Id,
}

impl JsonRpcResponse {
    /// Create a successful JSON-RPC 2.0 response
    ///
    /// A `null` result is kept and serialized as `"result": null`.
    pub fn success(result: Value, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error JSON-RPC 2.0 response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Check if the response represents a successful result
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Check if the response represents an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<JsonRpcResponse> for Value {
    /// Build the response object member by member, so the conversion cannot
    /// fail the way a generic `serde_json::to_value` call could.
    fn from(response: JsonRpcResponse) -> Self {
        let mut object = Map::with_capacity(3);
        object.insert("jsonrpc".to_string(), Value::String(response.jsonrpc));
        match response.error {
            Some(error) => {
                let mut error_object = Map::with_capacity(3);
                error_object.insert("code".to_string(), Value::from(error.code));
                error_object.insert("message".to_string(), Value::String(error.message));
                if let Some(data) = error.data {
                    error_object.insert("data".to_string(), data);
                }
                object.insert("error".to_string(), Value::Object(error_object));
            }
            None => {
                object.insert(
                    "result".to_string(),
                    response.result.unwrap_or(Value::Null),
                );
            }
        }
        object.insert("id".to_string(), response.id.into());
        Value::Object(object)
    }
}

/// A candidate that passed structural validation
///
/// Produced by the request validator and discarded once the candidate's
/// outcome is known. `id` is `None` for notifications and `Some(Id::Null)`
/// for a call that explicitly sent `"id": null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    /// Method name, never empty
    pub method: String,
    /// Parameters, always an array or object when present
    pub params: Option<Value>,
    /// Request id, absent for notifications
    pub id: Option<Id>,
}

impl RequestEnvelope {
    /// Whether this envelope is a notification (no `id` member)
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Result of processing one candidate
///
/// Every input slot produces exactly one outcome. `Suppressed` stands for a
/// notification, whose outcome is never sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The handler produced a result
    Success {
        /// Id of the call
        id: Id,
        /// Handler result
        result: Value,
    },
    /// The candidate failed somewhere between validation and invocation
    Failure {
        /// Id of the call, or null when it could not be determined
        id: Id,
        /// Error to report
        error: JsonRpcErrorData,
    },
    /// No response is sent for this slot
    Suppressed,
}

impl Outcome {
    /// Whether this outcome produces no response
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Outcome::Suppressed)
    }

    /// Whether this outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_display() {
        assert_eq!(Id::String("test".to_string()).to_string(), "\"test\"");
        assert_eq!(Id::from(42i64).to_string(), "42");
        assert_eq!(Id::Null.to_string(), "null");
    }

    #[test]
    fn test_id_from_value() {
        assert_eq!(Id::from_value(&json!("a")), Some(Id::from("a")));
        assert_eq!(Id::from_value(&json!(7)), Some(Id::from(7i64)));
        assert_eq!(Id::from_value(&Value::Null), Some(Id::Null));
        assert_eq!(Id::from_value(&json!(true)), None);
        assert_eq!(Id::from_value(&json!([1])), None);
        assert_eq!(Id::from_value(&json!({"a": 1})), None);
    }

    #[test]
    fn test_float_and_large_ids_echo_verbatim() {
        let float: Id = serde_json::from_str("1.5").unwrap();
        assert_eq!(serde_json::to_string(&float).unwrap(), "1.5");

        let big: Id = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(Value::from(big), json!(u64::MAX));
    }

    #[test]
    fn test_success_response_to_value() {
        let resp = JsonRpcResponse::success(json!(5), Id::from(1i64));
        assert_eq!(Value::from(resp), json!({"jsonrpc": "2.0", "result": 5, "id": 1}));
    }

    #[test]
    fn test_null_result_is_kept() {
        let resp = JsonRpcResponse::success(Value::Null, Id::from("x"));
        assert!(resp.is_success());
        assert_eq!(
            Value::from(resp),
            json!({"jsonrpc": "2.0", "result": null, "id": "x"})
        );
    }

    #[test]
    fn test_error_response_to_value() {
        let resp = JsonRpcResponse::error(JsonRpcErrorData::method_not_found("nope", vec![]), Id::Null);
        assert!(resp.is_error());
        assert_eq!(
            Value::from(resp),
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found", "data": {"method": "nope", "available_methods": []}},
                "id": null
            })
        );
    }

    #[test]
    fn test_envelope_notification_flag() {
        let call = RequestEnvelope {
            method: "m".into(),
            params: None,
            id: Some(Id::Null),
        };
        let notification = RequestEnvelope { id: None, ..call.clone() };

        assert!(!call.is_notification());
        assert!(notification.is_notification());
    }
}
