//! Error types for rpcbase
//!
//! This module holds the canonical JSON-RPC 2.0 error taxonomy together with
//! the crate-wide error type. It defines three things:
//!
//! - **ErrorCode**: The fixed table of protocol error codes plus the ranges
//!   that handlers may use for application-defined errors
//! - **JsonRpcErrorData**: The wire-format error object `{code, message, data?}`
//! - **Error**: Rust-side errors for registration, configuration and handler
//!   execution (uses thiserror)
//!
//! # Spec-Compliant Error Codes
//!
//! JSON-RPC 2.0 defines standard error codes:
//! - `-32700`: Parse error (invalid JSON)
//! - `-32600`: Invalid Request (not a valid request object)
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error
//! - `-32000 to -32099`: Server error (implementation-defined)
//!
//! Positive codes are free for applications. Every other integer in
//! `-32768..=-32000` is reserved and never produced by a handler.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_core::{ErrorCode, JsonRpcErrorData};
//!
//! let error = JsonRpcErrorData::method_not_found("unknownMethod", vec!["add".to_string()]);
//! assert_eq!(error.code, -32601);
//! assert_eq!(error.kind(), Some(ErrorCode::MethodNotFound));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Result type for rpcbase operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for rpcbase operations
///
/// Protocol failures found while validating or routing a request never
/// surface as this type: they are turned into failure outcomes by the
/// dispatcher. `Error` is what handlers return, what registration and
/// configuration fail with, and what invocation hooks report.
///
/// # Conversion to JSON-RPC Errors
///
/// When a handler fails, the dispatcher maps its `Error` onto a
/// `JsonRpcErrorData`. Structured errors (`Error::JsonRpc`) with an
/// application or server code pass through unchanged; everything else
/// becomes an Internal error.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// JSON-RPC error already in wire format
    ///
    /// Handlers return this to report a structured application error.
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcErrorData),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No handler is registered under the requested method name
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// The method exists but the parameters are incorrect
    ///
    /// Typed handlers produce this when params cannot be deserialized
    /// into the handler's parameter type.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Unexpected failure while executing a method
    #[error("Internal error: {0}")]
    Internal(String),

    /// A handler did not finish within the configured time limit
    #[error("Handler timed out after {0:?}")]
    Timeout(Duration),

    /// A handler was cancelled by a caller-supplied cancellation token
    #[error("Handler cancelled")]
    Cancelled,

    /// A method with this name is already registered
    #[error("Duplicate method name for JSON-RPC service: '{0}'")]
    DuplicateMethod(String),

    /// The method name cannot be registered (e.g. it is empty)
    #[error("Invalid method name: {0:?}")]
    InvalidMethodName(String),

    /// The parameter schema supplied at registration was rejected
    #[error("Invalid schema for method '{method}': {reason}")]
    InvalidSchema {
        /// Method the schema was registered for
        method: String,
        /// Why the schema validator refused it
        reason: String,
    },

    /// Malformed dispatcher configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Entry of the canonical JSON-RPC 2.0 error taxonomy
///
/// The five protocol errors have fixed codes. `ServerError` covers the
/// implementation-defined range `-32099..=-32000` and `Application` covers
/// every positive code. Any other integer has no taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// -32700: invalid JSON was received
    ParseError,
    /// -32600: the JSON sent is not a valid request object
    InvalidRequest,
    /// -32601: the method does not exist or is not available
    MethodNotFound,
    /// -32602: invalid method parameter(s)
    InvalidParams,
    /// -32603: internal JSON-RPC error
    InternalError,
    /// -32099..=-32000: implementation-defined server error
    ServerError(i32),
    /// 1 and above: application-defined error
    Application(i32),
}

impl ErrorCode {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const SERVER_ERROR_MIN: i32 = -32099;
    pub const SERVER_ERROR_MAX: i32 = -32000;

    /// Resolve an integer code to its taxonomy entry
    ///
    /// Returns `None` for reserved codes without a definition and for
    /// zero or negative codes outside the server range.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::PARSE_ERROR => Some(Self::ParseError),
            Self::INVALID_REQUEST => Some(Self::InvalidRequest),
            Self::METHOD_NOT_FOUND => Some(Self::MethodNotFound),
            Self::INVALID_PARAMS => Some(Self::InvalidParams),
            Self::INTERNAL_ERROR => Some(Self::InternalError),
            Self::SERVER_ERROR_MIN..=Self::SERVER_ERROR_MAX => Some(Self::ServerError(code)),
            c if c >= 1 => Some(Self::Application(c)),
            _ => None,
        }
    }

    /// Numeric wire code
    pub fn code(self) -> i32 {
        match self {
            Self::ParseError => Self::PARSE_ERROR,
            Self::InvalidRequest => Self::INVALID_REQUEST,
            Self::MethodNotFound => Self::METHOD_NOT_FOUND,
            Self::InvalidParams => Self::INVALID_PARAMS,
            Self::InternalError => Self::INTERNAL_ERROR,
            Self::ServerError(code) | Self::Application(code) => code,
        }
    }

    /// Canonical message for the taxonomy entry
    pub fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ServerError(_) => "Server error",
            Self::Application(_) => "Application error",
        }
    }

    /// Whether a handler may report this code and have it passed through
    ///
    /// Server and application codes always pass. Of the protocol errors only
    /// InvalidParams and InternalError make sense coming from a handler; the
    /// others describe envelope or routing problems the engine owns.
    pub fn is_handler_reportable(self) -> bool {
        matches!(
            self,
            Self::InvalidParams | Self::InternalError | Self::ServerError(_) | Self::Application(_)
        )
    }
}

/// JSON-RPC 2.0 error object as defined in the specification
///
/// This structure is the exact wire format for JSON-RPC errors and appears
/// in the `error` member of a response. It MUST contain `code` and `message`
/// and MAY contain `data`.
///
/// The factory methods produce the canonical message for each taxonomy
/// entry and put the situational detail into `data`, so that clients can
/// match on `message` while still seeing why the request failed.
///
/// # Examples
///
/// ```rust
/// use rpcbase_core::JsonRpcErrorData;
/// use serde_json::json;
///
/// let custom = JsonRpcErrorData::with_data(
///     1001,
///     "Insufficient funds",
///     json!({"balance": 50, "required": 100})
/// );
/// assert_eq!(custom.code, 1001);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code indicating the error type
    pub code: i32,

    /// Short description of the error
    pub message: String,

    /// Optional additional error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Create a new JSON-RPC error with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new JSON-RPC error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create the canonical error for a taxonomy entry, without data
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code.code(), code.message())
    }

    /// Replace the `data` member
    pub fn attach_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Taxonomy entry for this error's code, if it has one
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    /// Create a parse error (-32700)
    ///
    /// `details` is the decoder's description of what went wrong.
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::ParseError).attach_data(json!({ "details": details.into() }))
    }

    /// Create an invalid request error (-32600)
    ///
    /// `details` says which envelope rule the value broke.
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::InvalidRequest).attach_data(json!({ "details": details.into() }))
    }

    /// Create a method not found error (-32601)
    ///
    /// `available` lists the registered method names, in the order they
    /// should be reported.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rpcbase_core::JsonRpcErrorData;
    /// use serde_json::json;
    ///
    /// let error = JsonRpcErrorData::method_not_found("calculateFoo", vec!["add".to_string()]);
    /// assert_eq!(error.message, "Method not found");
    /// assert_eq!(
    ///     error.data.unwrap(),
    ///     json!({"method": "calculateFoo", "available_methods": ["add"]})
    /// );
    /// ```
    pub fn method_not_found(method: impl Into<String>, available: Vec<String>) -> Self {
        Self::from_code(ErrorCode::MethodNotFound).attach_data(json!({
            "method": method.into(),
            "available_methods": available,
        }))
    }

    /// Create an invalid params error (-32602)
    ///
    /// `violations` is the list of schema violations (or an equivalent
    /// description) explaining why the params were refused.
    pub fn invalid_params(violations: Value) -> Self {
        Self::from_code(ErrorCode::InvalidParams).attach_data(violations)
    }

    /// Create an internal error (-32603)
    pub fn internal_error(details: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::InternalError).attach_data(json!({ "details": details.into() }))
    }

    /// Create a server error in the implementation-defined range
    ///
    /// Codes outside `-32099..=-32000` are clamped into the range's upper
    /// bound so the result always stays a valid server error.
    pub fn server_error(code: i32, message: impl Into<String>) -> Self {
        let code = if (ErrorCode::SERVER_ERROR_MIN..=ErrorCode::SERVER_ERROR_MAX).contains(&code) {
            code
        } else {
            ErrorCode::SERVER_ERROR_MAX
        };
        Self::new(code, message)
    }

    /// Create a batch size exceeded error (-32600)
    pub fn batch_size_exceeded(limit: usize, actual: usize) -> Self {
        Self::from_code(ErrorCode::InvalidRequest).attach_data(json!({
            "details": format!("Batch size limit exceeded: limit={}, actual={}", limit, actual),
            "limit": limit,
            "actual": actual,
        }))
    }
}

impl std::fmt::Display for JsonRpcErrorData {
    /// Formats as "[code] message", e.g. "[-32601] Method not found"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_jsonrpc_error_codes() {
        let errors = vec![
            (JsonRpcErrorData::parse_error("test"), -32700, "Parse error"),
            (JsonRpcErrorData::invalid_request("test"), -32600, "Invalid Request"),
            (JsonRpcErrorData::method_not_found("test", vec![]), -32601, "Method not found"),
            (JsonRpcErrorData::invalid_params(json!([])), -32602, "Invalid params"),
            (JsonRpcErrorData::internal_error("test"), -32603, "Internal error"),
        ];

        for (error, expected_code, expected_message) in errors {
            assert_eq!(error.code, expected_code);
            assert_eq!(error.message, expected_message);
            assert!(error.data.is_some());
        }
    }

    #[test]
    fn test_from_code_taxonomy() {
        assert_eq!(ErrorCode::from_code(-32700), Some(ErrorCode::ParseError));
        assert_eq!(ErrorCode::from_code(-32603), Some(ErrorCode::InternalError));
        assert_eq!(ErrorCode::from_code(-32000), Some(ErrorCode::ServerError(-32000)));
        assert_eq!(ErrorCode::from_code(-32099), Some(ErrorCode::ServerError(-32099)));
        assert_eq!(ErrorCode::from_code(1), Some(ErrorCode::Application(1)));
        assert_eq!(ErrorCode::from_code(i32::MAX), Some(ErrorCode::Application(i32::MAX)));

        // Reserved but undefined, zero and ordinary negatives have no entry
        assert_eq!(ErrorCode::from_code(-32100), None);
        assert_eq!(ErrorCode::from_code(-32768), None);
        assert_eq!(ErrorCode::from_code(0), None);
        assert_eq!(ErrorCode::from_code(-100), None);
    }

    #[test]
    fn test_code_round_trips_through_taxonomy() {
        for code in [-32700, -32600, -32601, -32602, -32603, -32050, 7] {
            assert_eq!(ErrorCode::from_code(code).map(ErrorCode::code), Some(code));
        }
    }

    #[test]
    fn test_handler_reportable_codes() {
        assert!(ErrorCode::InvalidParams.is_handler_reportable());
        assert!(ErrorCode::InternalError.is_handler_reportable());
        assert!(ErrorCode::ServerError(-32001).is_handler_reportable());
        assert!(ErrorCode::Application(42).is_handler_reportable());

        assert!(!ErrorCode::ParseError.is_handler_reportable());
        assert!(!ErrorCode::InvalidRequest.is_handler_reportable());
        assert!(!ErrorCode::MethodNotFound.is_handler_reportable());
    }

    #[test]
    fn test_details_live_in_data() {
        let error = JsonRpcErrorData::invalid_request("Batch request array is empty");
        assert_eq!(error.message, "Invalid Request");
        assert_eq!(
            error.data,
            Some(json!({"details": "Batch request array is empty"}))
        );
    }

    #[test]
    fn test_server_error_clamps_out_of_range_codes() {
        assert_eq!(JsonRpcErrorData::server_error(-32010, "busy").code, -32010);
        assert_eq!(JsonRpcErrorData::server_error(-100, "busy").code, -32000);
    }

    #[test]
    fn test_batch_size_exceeded_creation() {
        let error = JsonRpcErrorData::batch_size_exceeded(100, 150);
        let data = error.data.unwrap();

        assert_eq!(error.code, -32600);
        assert_eq!(data["limit"], 100);
        assert_eq!(data["actual"], 150);
    }

    #[test]
    fn test_error_data_omitted_when_absent() {
        let error = JsonRpcErrorData::new(-32000, "Custom error");
        let serialized = serde_json::to_value(&error).unwrap();

        assert_eq!(serialized, json!({"code": -32000, "message": "Custom error"}));
    }

    #[test]
    fn test_error_deserialization() {
        let json = r#"{"code":-32601,"message":"Method not found"}"#;
        let error: JsonRpcErrorData = serde_json::from_str(json).unwrap();

        assert_eq!(error.kind(), Some(ErrorCode::MethodNotFound));
        assert!(error.data.is_none());
    }

    #[test]
    fn test_jsonrpc_error_display() {
        let error = JsonRpcErrorData::method_not_found("unknownMethod", Vec::new());
        assert_eq!(error.to_string(), "[-32601] Method not found");
    }

    #[test]
    fn test_error_display_formatting() {
        let error = Error::DuplicateMethod("noop".to_string());
        assert_eq!(
            error.to_string(),
            "Duplicate method name for JSON-RPC service: 'noop'"
        );

        let error = Error::from(JsonRpcErrorData::internal_error("boom"));
        assert!(error.to_string().contains("-32603"));
    }
}
