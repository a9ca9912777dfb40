//! Structural validation of request envelopes
//!
//! Checks one decoded candidate against the JSON-RPC 2.0 request shape. The
//! rules are applied in order and the first failure wins:
//!
//! 1. The candidate must be an object
//! 2. `jsonrpc` must be exactly the string `"2.0"`
//! 3. `method` must be a non-empty string
//! 4. `params`, when present, must be an array or an object
//! 5. `id`, when present, must be a string, a number or null
//!
//! The validator never consults the registry. Whether a failure is answered
//! is decided later by the dispatcher, so a rejection carries everything that
//! decision needs: the id to echo, whether the candidate was a notification,
//! and whether it looked like a request at all.

use rpcbase_core::{Id, JsonRpcErrorData, RequestEnvelope, JSONRPC_VERSION};
use serde_json::{Map, Value};

/// Envelope members; an object with none of them is not a request at all
const ENVELOPE_MEMBERS: [&str; 4] = ["jsonrpc", "method", "params", "id"];

/// A candidate rejected by structural validation
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidEnvelope {
    /// Id to echo: the candidate's id if it was a valid one, otherwise null
    pub id: Id,
    /// The candidate is an object without an `id` member
    pub notification: bool,
    /// The candidate is an object carrying at least one envelope member
    pub recognizable: bool,
    /// The Invalid Request error to report
    pub error: JsonRpcErrorData,
}

/// Classifies decoded values as valid envelopes or rejections
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidator;

impl RequestValidator {
    /// Validate one candidate
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rpcbase_server::RequestValidator;
    /// use serde_json::json;
    ///
    /// let envelope = RequestValidator::validate(&json!({"jsonrpc": "2.0", "method": "ping", "id": 1})).unwrap();
    /// assert_eq!(envelope.method, "ping");
    ///
    /// let rejected = RequestValidator::validate(&json!({"jsonrpc": "1.0", "method": "ping", "id": 1})).unwrap_err();
    /// assert_eq!(rejected.error.code, -32600);
    /// ```
    pub fn validate(value: &Value) -> Result<RequestEnvelope, InvalidEnvelope> {
        let object = match value {
            Value::Object(object) => object,
            _ => {
                return Err(InvalidEnvelope {
                    id: Id::Null,
                    notification: false,
                    recognizable: false,
                    error: JsonRpcErrorData::invalid_request("Request must be a JSON object"),
                })
            }
        };

        let raw_id = object.get("id");
        let id = raw_id.map(Id::from_value);
        let echo_id = id.clone().flatten().unwrap_or(Id::Null);
        let reject = |details: &str| InvalidEnvelope {
            id: echo_id.clone(),
            notification: raw_id.is_none(),
            recognizable: is_recognizable(object),
            error: JsonRpcErrorData::invalid_request(details),
        };

        match object.get("jsonrpc") {
            Some(Value::String(version)) if version == JSONRPC_VERSION => {}
            Some(_) => return Err(reject("Invalid JSON-RPC version")),
            None => return Err(reject("Missing JSON-RPC version")),
        }

        let method = match object.get("method") {
            Some(Value::String(method)) if !method.is_empty() => method.clone(),
            Some(Value::String(_)) => return Err(reject("The \"method\" field must not be empty")),
            Some(_) => {
                return Err(reject(
                    "Invalid type for the \"method\" field; must be a string",
                ))
            }
            None => return Err(reject("The required \"method\" field is missing")),
        };

        let params = match object.get("params") {
            None => None,
            Some(params) if params.is_array() || params.is_object() => Some(params.clone()),
            Some(_) => return Err(reject("Invalid type for the `params` field")),
        };

        let id = match id {
            None => None,
            Some(Some(id)) => Some(id),
            Some(None) => return Err(reject("Invalid type for the `id` field")),
        };

        Ok(RequestEnvelope { method, params, id })
    }
}

fn is_recognizable(object: &Map<String, Value>) -> bool {
    ENVELOPE_MEMBERS.iter().any(|member| object.contains_key(*member))
}
