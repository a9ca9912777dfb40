//! Codec between JSON text and engine values
//!
//! The dispatch engine works on decoded `serde_json::Value`s and leaves text
//! handling to the caller. This module covers the text side for callers that
//! want it: turning raw payload text into a value, or reporting why it could
//! not be decoded, and encoding replies back to text.
//!
//! Text that is not valid JSON decodes to a Parse error (-32700) whose
//! `data.details` carries the decoder's message.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_core::codec;
//!
//! let value = codec::decode_value(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#).unwrap();
//! assert_eq!(value["method"], "ping");
//!
//! let err = codec::decode_value("{not json").unwrap_err();
//! assert_eq!(err.code, -32700);
//! ```

use crate::error::JsonRpcErrorData;
use serde_json::Value;

/// Decode payload text into a JSON value
///
/// Any JSON value is accepted, including scalars and empty arrays: deciding
/// whether it is a valid request or batch is the dispatcher's job.
///
/// # Errors
///
/// Returns the Parse error object to send back when the text is not JSON.
pub fn decode_value(data: &str) -> std::result::Result<Value, JsonRpcErrorData> {
    serde_json::from_str(data).map_err(|e| JsonRpcErrorData::parse_error(e.to_string()))
}

/// Encode a decoded reply value back to text
///
/// `Value`s always serialize, so this never fails.
pub fn encode_value(value: &Value) -> String {
    value.to_string()
}
