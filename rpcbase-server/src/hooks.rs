//! Invocation hooks wrapping handler futures
//!
//! The engine puts no time limit on handlers and never cancels them by
//! itself. Hooks are the extension point for doing so: each hook receives
//! the handler's future and returns a future to run in its place.
//!
//! A hook that gives up on a handler resolves with an error
//! (`Error::Timeout`, `Error::Cancelled`, or its own), which the dispatcher
//! reports as an Internal error for that one call. Sibling calls in the same
//! batch are unaffected.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::{DispatcherBuilder, TimeoutHook};
//! use std::time::Duration;
//!
//! let dispatcher = DispatcherBuilder::new()
//!     .hook(TimeoutHook::new(Duration::from_secs(5)))
//!     .build()
//!     .unwrap();
//! ```

use crate::handler::{HandlerResult, RequestContext};
use rpcbase_core::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wraps each handler invocation
pub trait InvocationHook: Send + Sync {
    /// Return the future to run in place of `invocation`
    fn wrap(&self, ctx: &RequestContext, invocation: HandlerResult) -> HandlerResult;
}

/// Fails invocations that run longer than a fixed duration
#[derive(Debug, Clone, Copy)]
pub struct TimeoutHook {
    limit: Duration,
}

impl TimeoutHook {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    /// The configured limit
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl InvocationHook for TimeoutHook {
    fn wrap(&self, ctx: &RequestContext, invocation: HandlerResult) -> HandlerResult {
        let limit = self.limit;
        let method = ctx.method().to_string();
        Box::pin(async move {
            match tokio::time::timeout(limit, invocation).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(method = %method, limit_ms = limit.as_millis() as u64, "Handler timed out");
                    Err(Error::Timeout(limit))
                }
            }
        })
    }
}

/// Abandons invocations once a cancellation token fires
///
/// Invocations started after the token was cancelled fail immediately
/// without polling the handler.
#[derive(Debug, Clone)]
pub struct CancellationHook {
    token: CancellationToken,
}

impl CancellationHook {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl InvocationHook for CancellationHook {
    fn wrap(&self, ctx: &RequestContext, invocation: HandlerResult) -> HandlerResult {
        let token = self.token.clone();
        let method = ctx.method().to_string();
        Box::pin(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(method = %method, "Handler cancelled");
                    Err(Error::Cancelled)
                }
                result = invocation => result,
            }
        })
    }
}

/// Apply hooks in order; the first hook ends up innermost
pub(crate) fn apply_hooks(
    hooks: &[Arc<dyn InvocationHook>],
    ctx: &RequestContext,
    invocation: HandlerResult,
) -> HandlerResult {
    hooks
        .iter()
        .fold(invocation, |invocation, hook| hook.wrap(ctx, invocation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn ctx() -> RequestContext {
        RequestContext::new("slow", None)
    }

    fn sleeper(ms: u64) -> HandlerResult {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(json!(ms))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_hook_expires() {
        let hook = TimeoutHook::new(Duration::from_millis(50));
        let result = hook.wrap(&ctx(), sleeper(1_000)).await;
        assert!(matches!(result, Err(Error::Timeout(d)) if d == Duration::from_millis(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_hook_passes_fast_handlers() {
        let hook = TimeoutHook::new(Duration::from_millis(50));
        let result = hook.wrap(&ctx(), sleeper(10)).await;
        assert_eq!(result.unwrap(), json!(10));
    }

    #[tokio::test]
    async fn test_cancellation_hook() {
        let token = CancellationToken::new();
        let hook = CancellationHook::new(token.clone());

        let pending: HandlerResult = Box::pin(futures::future::pending::<rpcbase_core::Result<Value>>());
        let wrapped = hook.wrap(&ctx(), pending);
        token.cancel();

        assert!(matches!(wrapped.await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_handler() {
        let token = CancellationToken::new();
        token.cancel();
        let hook = CancellationHook::new(token);

        let handler: HandlerResult = Box::pin(async {
            if true {
                panic!("handler must not be polled");
            }
            Ok::<Value, Error>(Value::Null)
        });
        let result = hook.wrap(&ctx(), handler).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_hooks_in_order() {
        let hooks: Vec<Arc<dyn InvocationHook>> = vec![
            Arc::new(TimeoutHook::new(Duration::from_millis(10))),
            Arc::new(CancellationHook::new(CancellationToken::new())),
        ];

        let result = apply_hooks(&hooks, &ctx(), sleeper(100)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));

        let result = apply_hooks(&[], &ctx(), sleeper(1)).await;
        assert_eq!(result.unwrap(), json!(1));
    }
}
