//! rpcbase - JSON-RPC 2.0 validation and dispatch
//!
//! This is the convenience crate that re-exports the rpcbase sub-crates.
//! Use it if you want a single dependency for the whole engine.
//!
//! # Architecture
//!
//! rpcbase is organized into modular crates:
//!
//! - **rpcbase-core**: Wire types, error taxonomy, codec, observability
//! - **rpcbase-server**: Registry, validators, dispatcher, middleware and hooks
//! - **rpcbase-macros**: The `#[handler]` attribute macro
//!
//! # Quick Start
//!
//! ```rust
//! use rpcbase::{handler, Dispatcher, DispatcherBuilder};
//! use rpcbase::core::Result;
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct AddParams { a: i32, b: i32 }
//!
//! #[handler]
//! async fn add(params: AddParams) -> Result<i32> {
//!     Ok(params.a + params.b)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let dispatcher: Dispatcher = DispatcherBuilder::new()
//!         .method("add", add())
//!         .build()?;
//!
//!     let reply = dispatcher
//!         .dispatch(json!({"jsonrpc": "2.0", "method": "add", "params": {"a": 5, "b": 3}, "id": 1}))
//!         .await;
//!     assert_eq!(reply, Some(json!({"jsonrpc": "2.0", "result": 8, "id": 1})));
//!     Ok(())
//! }
//! ```
//!
//! Transports own the bytes: decode the incoming frame, call `dispatch`
//! (or `dispatch_str` on raw text), and send back the reply if there is one.

pub use rpcbase_core as core;
pub use rpcbase_macros as macros;
pub use rpcbase_server as server;

// Convenience re-exports of the most commonly used types
pub use rpcbase_core::{Error, Id, JsonRpcErrorData, Result};
pub use rpcbase_macros::handler;
pub use rpcbase_server::{DispatchContext, Dispatcher, DispatcherBuilder, DispatcherConfig};
