//! Middleware around handler invocation
//!
//! Middleware sees every call that made it past envelope validation, routing
//! and parameter validation, right before its handler runs. Typical uses are
//! logging, authorization checks against dispatch metadata, and counters.
//!
//! # Middleware Chain
//!
//! Middleware runs in registration order. Each `pre_handle` can:
//! - Inspect or rewrite the params handed to the handler
//! - Stash values in the context for later middleware
//! - Short-circuit with a result, skipping the handler
//! - Reject the call by returning an error
//!
//! After the handler, `post_handle` runs in reverse order. Its errors are
//! ignored so every middleware gets to observe the result.
//!
//! # Built-in Middleware
//!
//! - **TracingMiddleware**: emits `tracing` events per call
//! - **MetricsMiddleware**: in-process call and failure counters
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::{MiddlewareChain, TracingMiddleware};
//!
//! let mut chain = MiddlewareChain::new();
//! chain.add_sync(TracingMiddleware);
//! assert_eq!(chain.len(), 1);
//! ```

use crate::handler::RequestContext;
use async_trait::async_trait;
use rpcbase_core::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Action to take after middleware pre-processing
#[derive(Debug, Clone)]
pub enum MiddlewareAction {
    /// Continue to next middleware/handler
    Continue,
    /// Skip the handler and answer with this value
    ShortCircuit(Value),
}

/// Per-call state shared along the middleware chain
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    /// The RPC method being called
    pub method: String,
    /// Params the handler will receive
    pub params: Option<Value>,
    /// Context the handler will receive
    pub request: RequestContext,
    /// Scratch values passed between middleware
    pub extensions: HashMap<String, Value>,
}

impl MiddlewareContext {
    /// Create a middleware context for one call
    pub fn new(params: Option<Value>, request: RequestContext) -> Self {
        Self {
            method: request.method().to_string(),
            params,
            request,
            extensions: HashMap::new(),
        }
    }

    /// Insert a value that later middleware can read
    pub fn insert_extension(&mut self, key: impl Into<String>, value: Value) {
        self.extensions.insert(key.into(), value);
    }

    /// Get a value stored by earlier middleware
    pub fn get_extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}

/// Trait for async middleware
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Called before handler execution
    async fn pre_handle(&self, ctx: &mut MiddlewareContext) -> Result<MiddlewareAction>;

    /// Called after handler execution
    async fn post_handle(&self, ctx: &mut MiddlewareContext, result: &Result<Value>) -> Result<()>;
}

/// Trait for synchronous middleware
pub trait SyncMiddleware: Send + Sync {
    /// Called before handler execution
    fn pre_handle(&self, ctx: &mut MiddlewareContext) -> Result<MiddlewareAction>;

    /// Called after handler execution
    fn post_handle(&self, ctx: &mut MiddlewareContext, result: &Result<Value>) -> Result<()>;
}

struct SyncMiddlewareAdapter<T: SyncMiddleware> {
    inner: T,
}

#[async_trait]
impl<T: SyncMiddleware + 'static> Middleware for SyncMiddlewareAdapter<T> {
    async fn pre_handle(&self, ctx: &mut MiddlewareContext) -> Result<MiddlewareAction> {
        self.inner.pre_handle(ctx)
    }

    async fn post_handle(&self, ctx: &mut MiddlewareContext, result: &Result<Value>) -> Result<()> {
        self.inner.post_handle(ctx, result)
    }
}

/// Ordered chain of middleware
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Add a sync middleware to the chain
    pub fn add_sync<T: SyncMiddleware + 'static>(&mut self, middleware: T) {
        self.middlewares
            .push(Arc::new(SyncMiddlewareAdapter { inner: middleware }));
    }

    /// Run the chain around `handler`
    ///
    /// A short-circuit skips the handler and the `post_handle` pass. An
    /// error from `pre_handle` becomes the call's result.
    pub async fn execute<F, Fut>(&self, mut ctx: MiddlewareContext, handler: F) -> Result<Value>
    where
        F: FnOnce(MiddlewareContext) -> Fut + Send,
        Fut: std::future::Future<Output = Result<Value>> + Send,
    {
        for middleware in &self.middlewares {
            match middleware.pre_handle(&mut ctx).await? {
                MiddlewareAction::Continue => {}
                MiddlewareAction::ShortCircuit(value) => return Ok(value),
            }
        }

        let result = handler(ctx.clone()).await;

        for middleware in self.middlewares.iter().rev() {
            let _ = middleware.post_handle(&mut ctx, &result).await;
        }

        result
    }

    /// Get the number of middleware in the chain
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

/// Emits a `tracing` event before and after each call
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl SyncMiddleware for TracingMiddleware {
    fn pre_handle(&self, ctx: &mut MiddlewareContext) -> Result<MiddlewareAction> {
        tracing::debug!(
            method = %ctx.method,
            id = ?ctx.request.id(),
            notification = ctx.request.is_notification(),
            "Invoking handler"
        );
        Ok(MiddlewareAction::Continue)
    }

    fn post_handle(&self, ctx: &mut MiddlewareContext, result: &Result<Value>) -> Result<()> {
        match result {
            Ok(_) => tracing::debug!(method = %ctx.method, id = ?ctx.request.id(), "Handler succeeded"),
            Err(e) => tracing::debug!(
                method = %ctx.method,
                id = ?ctx.request.id(),
                error = %e,
                "Handler failed"
            ),
        }
        Ok(())
    }
}

const STARTED_AT_KEY: &str = "metrics.started_at_ms";

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Counts calls and failures, and logs per-call latency
///
/// Clones share the same counters, so a clone can be kept for reading while
/// the original is handed to the builder.
#[derive(Debug, Clone, Default)]
pub struct MetricsMiddleware {
    calls: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls that reached the middleware
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Calls whose handler returned an error
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    async fn pre_handle(&self, ctx: &mut MiddlewareContext) -> Result<MiddlewareAction> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        ctx.insert_extension(STARTED_AT_KEY, Value::from(now_millis()));
        Ok(MiddlewareAction::Continue)
    }

    async fn post_handle(&self, ctx: &mut MiddlewareContext, result: &Result<Value>) -> Result<()> {
        if result.is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(started) = ctx.get_extension(STARTED_AT_KEY).and_then(Value::as_u64) {
            let elapsed_ms = now_millis().saturating_sub(started);
            tracing::trace!(method = %ctx.method, elapsed_ms, "Handler finished");
        }
        Ok(())
    }
}
