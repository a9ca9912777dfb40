//! Validation and dispatch pipeline
//!
//! The dispatcher takes one decoded JSON payload and produces the reply to
//! send back, if any. Every candidate in the payload goes through the same
//! stages, and the first stage that fails decides the outcome:
//!
//! 1. Envelope validation (`RequestValidator`)
//! 2. Method lookup (`MethodRegistry`)
//! 3. Parameter validation (`ParamValidator`)
//! 4. Handler invocation, through middleware and hooks
//!
//! Failures never escape as errors; they become failure outcomes for their
//! own slot. A panic in stages 2 to 4 is caught and reported as an Internal
//! error carrying the request's id. Notifications are then suppressed according to the
//! `NotificationPolicy`, and the remaining outcomes are assembled by the
//! `ResponseBuilder`.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::{from_typed_fn, DispatcherBuilder};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> rpcbase_core::Result<()> {
//! let dispatcher = DispatcherBuilder::new()
//!     .method("add", from_typed_fn(|(a, b): (i64, i64)| async move { Ok(a + b) }))
//!     .build()?;
//!
//! let reply = dispatcher
//!     .dispatch(json!({"jsonrpc": "2.0", "method": "add", "params": [2, 3], "id": 1}))
//!     .await;
//! assert_eq!(reply, Some(json!({"jsonrpc": "2.0", "result": 5, "id": 1})));
//! # Ok(())
//! # }
//! ```

use crate::batch::BatchProcessor;
use crate::config::NotificationPolicy;
use crate::handler::{Handler, RequestContext};
use crate::hooks::{apply_hooks, CancellationHook, InvocationHook};
use crate::metrics::{DispatchMetrics, STATUS_ERROR, STATUS_SUCCESS, STATUS_SUPPRESSED};
use crate::middleware::{MiddlewareChain, MiddlewareContext};
use crate::params::ParamValidator;
use crate::registry::{MethodEntry, MethodRegistry};
use crate::response::ResponseBuilder;
use crate::schema::{violations_to_value, Violation};
use crate::validator::{InvalidEnvelope, RequestValidator};
use futures::FutureExt;
use rpcbase_core::{
    codec, Error, ErrorCode, Id, JsonRpcErrorData, JsonRpcResponse, Outcome, RequestEnvelope,
    Result,
};
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-dispatch information supplied by the transport
///
/// # Examples
///
/// ```rust
/// use rpcbase_server::DispatchContext;
/// use serde_json::json;
///
/// let ctx = DispatchContext::new().with_metadata(json!({"user": "alice"}));
/// assert_eq!(ctx.metadata().unwrap()["user"], "alice");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    metadata: Option<Arc<Value>>,
    cancellation: Option<CancellationToken>,
}

impl DispatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach metadata every handler of this dispatch can read
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(Arc::new(metadata));
        self
    }

    /// Abandon the handlers of this dispatch once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_deref()
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

struct Inner {
    registry: Arc<MethodRegistry>,
    param_validator: ParamValidator,
    middleware: MiddlewareChain,
    hooks: Arc<[Arc<dyn InvocationHook>]>,
    batch: BatchProcessor,
    policy: NotificationPolicy,
    metrics: Option<DispatchMetrics>,
}

/// JSON-RPC 2.0 dispatcher
///
/// Cheap to clone; clones share the registry and configuration. Safe to call
/// from many tasks at once.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Create a dispatcher over `registry` with default settings
    ///
    /// Use `DispatcherBuilder` for anything beyond the defaults.
    pub fn new(registry: Arc<MethodRegistry>) -> Self {
        Self::from_parts(
            registry,
            ParamValidator::default(),
            MiddlewareChain::new(),
            Vec::new(),
            BatchProcessor::default(),
            NotificationPolicy::default(),
            None,
        )
    }

    pub(crate) fn from_parts(
        registry: Arc<MethodRegistry>,
        param_validator: ParamValidator,
        middleware: MiddlewareChain,
        hooks: Vec<Arc<dyn InvocationHook>>,
        batch: BatchProcessor,
        policy: NotificationPolicy,
        metrics: Option<DispatchMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                param_validator,
                middleware,
                hooks: hooks.into(),
                batch,
                policy,
                metrics,
            }),
        }
    }

    /// Create a builder
    pub fn builder() -> crate::DispatcherBuilder {
        crate::DispatcherBuilder::new()
    }

    /// The registry this dispatcher routes to
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.inner.registry
    }

    /// Notification policy in effect
    pub fn notification_policy(&self) -> NotificationPolicy {
        self.inner.policy
    }

    /// Register a method after construction
    ///
    /// The schema, if any, is checked first.
    ///
    /// # Errors
    ///
    /// `Error::InvalidSchema`, `Error::InvalidMethodName` or
    /// `Error::DuplicateMethod`.
    pub fn register_method(
        &self,
        name: impl Into<String>,
        handler: Box<dyn Handler>,
        param_schema: Option<Value>,
    ) -> Result<()> {
        let name = name.into();
        if let Some(schema) = &param_schema {
            self.inner.param_validator.check_schema(&name, schema)?;
        }
        self.inner.registry.register(name, handler, param_schema)
    }

    /// Dispatch a decoded payload
    ///
    /// Returns the reply to send, or `None` when nothing should be sent.
    pub async fn dispatch(&self, payload: Value) -> Option<Value> {
        self.dispatch_with(payload, DispatchContext::default()).await
    }

    /// Dispatch a decoded payload with transport-supplied context
    pub async fn dispatch_with(&self, payload: Value, ctx: DispatchContext) -> Option<Value> {
        match payload {
            Value::Array(candidates) => self.dispatch_batch(candidates, ctx).await,
            candidate => {
                let outcome = self.clone().process_candidate(candidate, ctx).await;
                ResponseBuilder::single(outcome)
            }
        }
    }

    /// Dispatch JSON text, returning the reply as text
    ///
    /// Text that is not valid JSON is answered with a Parse error whose id
    /// is null.
    pub async fn dispatch_str(&self, text: &str) -> Option<String> {
        match codec::decode_value(text) {
            Ok(payload) => self
                .dispatch(payload)
                .await
                .map(|reply| codec::encode_value(&reply)),
            Err(error) => {
                tracing::warn!(error = ?error.data, "Payload is not valid JSON");
                self.record_error(&error);
                let reply = Value::from(JsonRpcResponse::error(error, Id::Null));
                Some(codec::encode_value(&reply))
            }
        }
    }

    async fn dispatch_batch(&self, candidates: Vec<Value>, ctx: DispatchContext) -> Option<Value> {
        let batch = self.inner.batch;
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_batch(candidates.len(), batch.mode().as_str());
        }

        if candidates.is_empty() {
            tracing::warn!("Received empty batch");
            let error = JsonRpcErrorData::invalid_request("Batch request array is empty");
            return self.payload_failure(error);
        }
        if let Err(error) = batch.check_size(candidates.len()) {
            return self.payload_failure(error);
        }

        let outcomes = batch
            .process(candidates, |candidate| {
                self.clone().process_candidate(candidate, ctx.clone())
            })
            .await;
        ResponseBuilder::batch(outcomes)
    }

    /// A failure of the payload as a whole, answered once with id null
    fn payload_failure(&self, error: JsonRpcErrorData) -> Option<Value> {
        self.record_error(&error);
        ResponseBuilder::single(Outcome::Failure { id: Id::Null, error })
    }

    async fn process_candidate(self, candidate: Value, ctx: DispatchContext) -> Outcome {
        let started = Instant::now();

        let envelope = match RequestValidator::validate(&candidate) {
            Ok(envelope) => envelope,
            Err(rejected) => return self.rejected_outcome(rejected),
        };

        let method = envelope.method.clone();
        let id = envelope.id.clone();
        // Covers lookup, param validation and the handler
        let result = match AssertUnwindSafe(self.execute(envelope, &ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let details = panic_message(panic.as_ref());
                tracing::error!(method = %method, panic = %details, "Panicked while processing request");
                Err(JsonRpcErrorData::from_code(ErrorCode::InternalError).attach_data(json!({
                    "details": format!("Panicked while processing request: {}", details),
                    "method": method,
                })))
            }
        };

        let (outcome, status) = match (id, result) {
            (None, result) => {
                if let Err(error) = &result {
                    tracing::debug!(method = %method, code = error.code, "Suppressed notification failure");
                }
                self.record_suppressed();
                (Outcome::Suppressed, STATUS_SUPPRESSED)
            }
            (Some(id), Ok(result)) => (Outcome::Success { id, result }, STATUS_SUCCESS),
            (Some(id), Err(error)) => {
                self.record_error(&error);
                (Outcome::Failure { id, error }, STATUS_ERROR)
            }
        };

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_request(&method, status, started.elapsed().as_secs_f64());
        }
        outcome
    }

    fn rejected_outcome(&self, rejected: InvalidEnvelope) -> Outcome {
        tracing::debug!(
            id = %rejected.id,
            notification = rejected.notification,
            recognizable = rejected.recognizable,
            error = ?rejected.error.data,
            "Rejected request envelope"
        );

        let answered = !rejected.notification
            || !rejected.recognizable
            || self.inner.policy == NotificationPolicy::ReportInvalidRequest;

        if answered {
            self.record_error(&rejected.error);
            Outcome::Failure {
                id: rejected.id,
                error: rejected.error,
            }
        } else {
            self.record_suppressed();
            Outcome::Suppressed
        }
    }

    /// Route, validate params and invoke the handler
    async fn execute(
        &self,
        envelope: RequestEnvelope,
        ctx: &DispatchContext,
    ) -> std::result::Result<Value, JsonRpcErrorData> {
        let entry = match self.inner.registry.lookup(&envelope.method) {
            Ok(entry) => entry,
            Err(_) => {
                tracing::debug!(method = %envelope.method, "Method not found");
                return Err(JsonRpcErrorData::method_not_found(
                    &envelope.method,
                    self.inner.registry.methods(),
                ));
            }
        };

        self.inner.param_validator.validate(&envelope, &entry)?;

        let RequestEnvelope { method, params, id } = envelope;
        let request = RequestContext::new(method, id).with_metadata(ctx.metadata.clone());

        self.invoke(&entry, params, request, ctx.cancellation.clone())
            .await
            .map_err(|error| map_handler_error(entry.name(), error))
    }

    async fn invoke(
        &self,
        entry: &MethodEntry,
        params: Option<Value>,
        request: RequestContext,
        cancellation: Option<CancellationToken>,
    ) -> Result<Value> {
        let handler = Arc::clone(entry.handler());
        let hooks = Arc::clone(&self.inner.hooks);

        self.inner
            .middleware
            .execute(MiddlewareContext::new(params, request), move |mw_ctx| {
                let invocation = handler.handle(mw_ctx.params, mw_ctx.request.clone());
                let invocation = apply_hooks(&hooks, &mw_ctx.request, invocation);
                match cancellation {
                    Some(token) => CancellationHook::new(token).wrap(&mw_ctx.request, invocation),
                    None => invocation,
                }
            })
            .await
    }

    fn record_error(&self, error: &JsonRpcErrorData) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_error(error.code);
        }
    }

    fn record_suppressed(&self) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_suppressed();
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.inner.registry)
            .field("middleware", &self.inner.middleware.len())
            .field("hooks", &self.inner.hooks.len())
            .field("batch", &self.inner.batch)
            .field("policy", &self.inner.policy)
            .field("metrics", &self.inner.metrics.is_some())
            .finish()
    }
}

/// Convert a handler's error into the error object sent to the client
fn map_handler_error(method: &str, error: Error) -> JsonRpcErrorData {
    match error {
        Error::JsonRpc(error) => match error.kind() {
            Some(kind) if kind.is_handler_reportable() => error,
            _ => {
                tracing::warn!(method = %method, code = error.code, "Handler reported a reserved error code");
                JsonRpcErrorData::from_code(ErrorCode::InternalError).attach_data(json!({
                    "details": format!("Handler reported reserved error code {}", error.code),
                    "method": method,
                    "rejected_code": error.code,
                }))
            }
        },
        Error::InvalidParams(message) => {
            tracing::debug!(method = %method, error = %message, "Handler rejected params");
            JsonRpcErrorData::invalid_params(violations_to_value(&[Violation::new(message)]))
        }
        other => {
            tracing::warn!(method = %method, error = %other, "Handler failed");
            JsonRpcErrorData::from_code(ErrorCode::InternalError).attach_data(json!({
                "details": other.to_string(),
                "method": method,
            }))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
