//! Transport-agnostic JSON-RPC 2.0 dispatch engine
//!
//! This crate validates decoded JSON-RPC payloads, routes each request to a
//! registered handler and builds the reply. It never touches a socket: the
//! transport (HTTP, WebSocket, stdio, ...) decodes the incoming bytes, hands
//! the value to a `Dispatcher` and sends back whatever comes out.
//!
//! # Core Features
//!
//! - **Envelope Validation**: Strict JSON-RPC 2.0 request checks
//! - **Method Routing**: Named handlers in a thread-safe registry
//! - **Param Schemas**: Optional per-method schema, checked before the handler runs
//! - **Batch Processing**: Parallel or sequential, replies in input order
//! - **Notifications**: Suppressed replies, with a configurable policy for malformed ones
//! - **Middleware & Hooks**: Interceptors, timeouts and cancellation around handlers
//! - **Discovery**: Optional `rpc.discover` method
//! - **Observability**: OpenTelemetry integration for traces and metrics
//!
//! # Quick Start
//!
//! ```rust
//! use rpcbase_server::{from_typed_fn, DispatcherBuilder};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct AddParams { a: i32, b: i32 }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = DispatcherBuilder::new()
//!         .method("add", from_typed_fn(|p: AddParams| async move {
//!             Ok(p.a + p.b)
//!         }))
//!         .build()?;
//!
//!     let reply = dispatcher
//!         .dispatch_str(r#"{"jsonrpc": "2.0", "method": "add", "params": {"a": 1, "b": 2}, "id": 1}"#)
//!         .await
//!         .unwrap();
//!     let reply: serde_json::Value = serde_json::from_str(&reply)?;
//!     assert_eq!(reply, json!({"jsonrpc": "2.0", "result": 3, "id": 1}));
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! Each candidate of a payload is handled on its own:
//!
//! - **RequestValidator**: checks the envelope shape
//! - **MethodRegistry**: finds the handler
//! - **ParamValidator**: checks params against the method's schema
//! - **Handler**: runs inside the middleware chain and invocation hooks
//! - **ResponseBuilder**: turns outcomes into response objects
//!
//! A failure at any stage becomes an error response for that candidate
//! only; siblings in the same batch are unaffected.

mod batch;
mod builder;
mod config;
mod discovery;
mod dispatcher;
mod handler;
mod hooks;
mod metrics;
mod middleware;
mod params;
mod registry;
mod response;
mod schema;
mod validator;

pub use batch::{BatchMode, BatchProcessor};
pub use builder::DispatcherBuilder;
pub use config::{
    DispatcherConfig, NotificationPolicy, ENV_BATCH_MODE, ENV_HANDLER_TIMEOUT_MS,
    ENV_MAX_BATCH_SIZE, ENV_NOTIFICATION_POLICY,
};
pub use discovery::{discover_params_schema, DISCOVER_METHOD};
pub use dispatcher::{DispatchContext, Dispatcher};
pub use handler::{
    from_fn, from_fn_with_context, from_typed_fn, from_typed_fn_with_context, AsyncHandler,
    Handler, HandlerResult, RequestContext,
};
pub use hooks::{CancellationHook, InvocationHook, TimeoutHook};
pub use metrics::{DispatchMetrics, STATUS_ERROR, STATUS_SUCCESS, STATUS_SUPPRESSED};
pub use middleware::{
    MetricsMiddleware, Middleware, MiddlewareAction, MiddlewareChain, MiddlewareContext,
    SyncMiddleware, TracingMiddleware,
};
pub use params::ParamValidator;
pub use registry::{MethodEntry, MethodRegistry};
pub use response::ResponseBuilder;
pub use schema::{
    violations_to_value, BasicSchemaValidator, JsonSchemaValidator, PathSegment, SchemaValidator,
    Violation,
};
pub use validator::{InvalidEnvelope, RequestValidator};

/// Items used by code generated in `rpcbase-macros`
#[doc(hidden)]
pub mod __private {
    pub use serde::de::IgnoredAny;
}
