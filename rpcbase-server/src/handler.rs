//! Handler traits and adapters for JSON-RPC methods
//!
//! A handler is the unit of work registered under a method name. The
//! dispatcher hands it the request parameters (already checked against the
//! method's schema, if one was registered) together with a `RequestContext`
//! describing the call, and turns whatever it returns into an outcome.
//!
//! # Creating Handlers
//!
//! 1. **from_fn**: async closure over raw `Option<Value>` params
//! 2. **from_fn_with_context**: same, plus the `RequestContext`
//! 3. **from_typed_fn**: async closure with serde conversion on both sides
//! 4. **from_typed_fn_with_context**: typed, plus the `RequestContext`
//! 5. **#[handler] macro**: generates one of the typed forms (via rpcbase-macros)
//!
//! # Errors
//!
//! A handler reports failure by returning `Err`. Returning
//! `Error::JsonRpc` with an application or server-range code sends that
//! error to the client unchanged; any other error becomes an Internal error.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::{from_fn, from_typed_fn};
//! use serde::Deserialize;
//!
//! let status = from_fn(|_params| async move {
//!     Ok(serde_json::json!({"status": "ok"}))
//! });
//!
//! #[derive(Deserialize)]
//! struct AddParams { a: i64, b: i64 }
//!
//! let add = from_typed_fn(|params: AddParams| async move {
//!     Ok(params.a + params.b)
//! });
//! ```

use rpcbase_core::{Error, Id, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every handler
///
/// Different handlers have different concrete future types; boxing gives
/// the registry one type to store. `Send` lets parallel batches run the
/// future on any runtime worker.
pub type HandlerResult = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Per-invocation information passed to handlers
///
/// Built by the dispatcher for each candidate that reaches its handler.
/// Cheap to clone: caller metadata is shared behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    method: String,
    id: Option<Id>,
    metadata: Option<Arc<Value>>,
}

impl RequestContext {
    /// Create a context for a call or notification
    pub fn new(method: impl Into<String>, id: Option<Id>) -> Self {
        Self {
            method: method.into(),
            id,
            metadata: None,
        }
    }

    /// Attach caller-supplied metadata
    pub fn with_metadata(mut self, metadata: Option<Arc<Value>>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Name of the invoked method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Id of the call, `None` for notifications
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// Whether the invocation is a notification
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Metadata the transport passed to `dispatch_with`, if any
    ///
    /// Typically authentication or connection details. The engine never
    /// inspects it.
    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_deref()
    }
}

/// Trait for JSON-RPC method handlers
///
/// Handlers must be `Send + Sync` because one instance serves every
/// concurrent call to its method.
///
/// You rarely implement this directly; the adapter functions in this module
/// and the `#[handler]` macro cover the usual shapes. Implement it by hand
/// when a handler owns state:
///
/// ```rust
/// use rpcbase_server::{Handler, HandlerResult, RequestContext};
/// use serde_json::Value;
///
/// struct Version(&'static str);
///
/// impl Handler for Version {
///     fn handle(&self, _params: Option<Value>, _ctx: RequestContext) -> HandlerResult {
///         let version = self.0;
///         Box::pin(async move { Ok(Value::from(version)) })
///     }
/// }
/// ```
pub trait Handler: Send + Sync {
    /// Handle one invocation
    ///
    /// `params` is `None` when the request had no `params` member.
    fn handle(&self, params: Option<Value>, ctx: RequestContext) -> HandlerResult;
}

/// Adapter turning an async closure into a `Handler`
///
/// Closures cannot implement `Handler` directly; this wrapper gives us a
/// local type to implement it on.
pub struct AsyncHandler<F> {
    func: F,
}

impl<F, Fut> Handler for AsyncHandler<F>
where
    F: Fn(Option<Value>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn handle(&self, params: Option<Value>, ctx: RequestContext) -> HandlerResult {
        Box::pin((self.func)(params, ctx))
    }
}

/// Create a handler from an async function over raw JSON params
///
/// # Examples
///
/// ```rust
/// use rpcbase_server::from_fn;
///
/// let echo = from_fn(|params| async move {
///     Ok(params.unwrap_or(serde_json::Value::Null))
/// });
/// ```
pub fn from_fn<F, Fut>(func: F) -> Box<dyn Handler>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    from_fn_with_context(move |params, _ctx| func(params))
}

/// Create a handler from an async function over raw params and the context
///
/// # Examples
///
/// ```rust
/// use rpcbase_server::from_fn_with_context;
///
/// let whoami = from_fn_with_context(|_params, ctx| async move {
///     Ok(ctx.metadata().and_then(|m| m.get("user")).cloned().unwrap_or_default())
/// });
/// ```
pub fn from_fn_with_context<F, Fut>(func: F) -> Box<dyn Handler>
where
    F: Fn(Option<Value>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Box::new(AsyncHandler { func })
}

/// Create a handler with automatic parameter and result conversion
///
/// - Params that cannot be deserialized into `P` fail with
///   `Error::InvalidParams`, which the client sees as -32602
/// - Absent params are deserialized from `null`, so `()` and `Option<T>`
///   parameter types accept calls without params
/// - A result that cannot be serialized fails with `Error::Serialization`
///
/// # Examples
///
/// ```rust
/// use rpcbase_server::from_typed_fn;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize)]
/// struct AddParams { a: i32, b: i32 }
///
/// #[derive(Serialize)]
/// struct AddResult { sum: i32 }
///
/// let handler = from_typed_fn(|params: AddParams| async move {
///     Ok(AddResult { sum: params.a + params.b })
/// });
/// ```
pub fn from_typed_fn<P, R, F, Fut>(func: F) -> Box<dyn Handler>
where
    P: serde::de::DeserializeOwned + Send + 'static,
    R: serde::Serialize + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    from_typed_fn_with_context(move |params: P, _ctx| func(params))
}

/// Typed handler that also receives the `RequestContext`
pub fn from_typed_fn_with_context<P, R, F, Fut>(func: F) -> Box<dyn Handler>
where
    P: serde::de::DeserializeOwned + Send + 'static,
    R: serde::Serialize + Send + 'static,
    F: Fn(P, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    // Shared so each invocation's future can own a handle to the closure
    let func = Arc::new(func);

    from_fn_with_context(move |params: Option<Value>, ctx: RequestContext| {
        let func = Arc::clone(&func);
        async move {
            let params: P = serde_json::from_value(params.unwrap_or(Value::Null))
                .map_err(|e| Error::InvalidParams(e.to_string()))?;

            let result = func(params, ctx).await?;

            serde_json::to_value(result).map_err(|e| Error::Serialization(e.to_string()))
        }
    })
}
