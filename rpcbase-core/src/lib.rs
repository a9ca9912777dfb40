//! Core JSON-RPC 2.0 types, error taxonomy and codec for rpcbase
//!
//! This crate holds everything the dispatch engine and its callers share:
//!
//! - **Types**: ids, response objects, validated envelopes and per-candidate
//!   outcomes
//! - **Error handling**: the canonical error taxonomy and the crate-wide
//!   `Error` type
//! - **Codec**: conversion between JSON text and values
//! - **Observability**: OpenTelemetry and `tracing` initialization
//!
//! # Architecture
//!
//! The crate is transport-agnostic. `rpcbase-server` builds the validation
//! and dispatch engine on top of it; how payloads reach the engine is the
//! application's business.
//!
//! # Example
//!
//! ```rust
//! use rpcbase_core::{codec, Id, JsonRpcResponse};
//! use serde_json::{json, Value};
//!
//! let response = JsonRpcResponse::success(json!(5), Id::from(1i64));
//! let text = codec::encode_value(&Value::from(response));
//! assert_eq!(
//!     codec::decode_value(&text).unwrap(),
//!     json!({"jsonrpc": "2.0", "result": 5, "id": 1})
//! );
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, ErrorCode, JsonRpcErrorData, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{Id, JsonRpcResponse, Outcome, RequestEnvelope, JSONRPC_VERSION};
