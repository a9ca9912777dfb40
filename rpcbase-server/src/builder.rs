//! Dispatcher builder
//!
//! The builder provides a fluent API for configuring and creating a
//! `Dispatcher`. It allows you to:
//! - Register methods, with or without a params schema
//! - Swap the schema validator
//! - Configure batch processing and the notification policy
//! - Put a timeout or a cancellation token on handlers
//! - Add middleware and invocation hooks
//! - Enable `rpc.discover`
//! - Enable observability
//!
//! Registration errors (bad names, duplicates, rejected schemas) are
//! collected and reported by `build`.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::{from_fn, BatchMode, DispatcherBuilder, NotificationPolicy};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let dispatcher = DispatcherBuilder::new()
//!     .method("ping", from_fn(|_| async { Ok(json!("pong")) }))
//!     .method_with_schema(
//!         "echo",
//!         from_fn(|params| async move { Ok(params.unwrap_or_default()) }),
//!         json!({"type": "array", "maxItems": 3}),
//!     )
//!     .batch_mode(BatchMode::Sequential)
//!     .max_batch_size(100)
//!     .notification_policy(NotificationPolicy::ReportInvalidRequest)
//!     .handler_timeout(Duration::from_secs(10))
//!     .with_discovery(json!({"name": "demo"}))
//!     .build()
//!     .unwrap();
//!
//! assert!(dispatcher.registry().has_method("rpc.discover"));
//! ```

use crate::config::{DispatcherConfig, NotificationPolicy};
use crate::discovery::register_discovery;
use crate::hooks::{CancellationHook, InvocationHook, TimeoutHook};
use crate::params::ParamValidator;
use crate::{
    BatchMode, BatchProcessor, DispatchMetrics, Dispatcher, Handler, MethodRegistry, Middleware,
    MiddlewareChain, SchemaValidator, SyncMiddleware,
};
use rpcbase_core::{Error, ObservabilityConfig, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct PendingMethod {
    name: String,
    handler: Box<dyn Handler>,
    param_schema: Option<Value>,
}

/// Builder for constructing a dispatcher
pub struct DispatcherBuilder {
    registry: Option<Arc<MethodRegistry>>,
    methods: Vec<PendingMethod>,
    schema_validator: Option<Arc<dyn SchemaValidator>>,
    batch_mode: BatchMode,
    max_batch_size: Option<usize>,
    notification_policy: NotificationPolicy,
    handler_timeout: Option<Duration>,
    cancellation_token: Option<CancellationToken>,
    hooks: Vec<Arc<dyn InvocationHook>>,
    middleware_chain: MiddlewareChain,
    discovery: Option<Value>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl DispatcherBuilder {
    /// Create a new dispatcher builder
    pub fn new() -> Self {
        Self {
            registry: None,
            methods: Vec::new(),
            schema_validator: None,
            batch_mode: BatchMode::default(),
            max_batch_size: None,
            notification_policy: NotificationPolicy::default(),
            handler_timeout: None,
            cancellation_token: None,
            hooks: Vec::new(),
            middleware_chain: MiddlewareChain::new(),
            discovery: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Route to an existing registry instead of a fresh one
    pub fn registry(mut self, registry: Arc<MethodRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register a handler for a method
    pub fn method(mut self, name: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.methods.push(PendingMethod {
            name: name.into(),
            handler,
            param_schema: None,
        });
        self
    }

    /// Register a handler whose params are checked against `schema`
    pub fn method_with_schema(
        mut self,
        name: impl Into<String>,
        handler: Box<dyn Handler>,
        schema: Value,
    ) -> Self {
        self.methods.push(PendingMethod {
            name: name.into(),
            handler,
            param_schema: Some(schema),
        });
        self
    }

    /// Validate params with a custom schema validator
    pub fn schema_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.schema_validator = Some(validator);
        self
    }

    /// Set the batch processing mode
    pub fn batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    /// Set the maximum batch size limit
    pub fn max_batch_size(mut self, max_size: usize) -> Self {
        self.max_batch_size = Some(max_size);
        self
    }

    /// Set which failed notifications are answered
    pub fn notification_policy(mut self, policy: NotificationPolicy) -> Self {
        self.notification_policy = policy;
        self
    }

    /// Fail handlers that run longer than `timeout`
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    /// Abandon running handlers once `token` is cancelled
    ///
    /// Useful for shutdown: cancel the token and in-flight calls resolve
    /// with an Internal error.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Add an invocation hook
    ///
    /// Hooks wrap handlers in the order they are added; the first one added
    /// sits closest to the handler.
    pub fn hook<H: InvocationHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Add middleware to the dispatcher
    pub fn use_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware_chain.add(middleware);
        self
    }

    /// Add sync middleware to the dispatcher
    pub fn use_sync_middleware<T: SyncMiddleware + 'static>(mut self, middleware: T) -> Self {
        self.middleware_chain.add_sync(middleware);
        self
    }

    /// Answer `rpc.discover` with `service_info` and the method list
    pub fn with_discovery(mut self, service_info: Value) -> Self {
        self.discovery = Some(service_info);
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Apply every setting carried by `config`
    ///
    /// Later builder calls override it.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.batch_mode = config.batch_mode;
        self.max_batch_size = config.max_batch_size;
        self.notification_policy = config.notification_policy;
        self.handler_timeout = config.handler_timeout();
        self
    }

    /// Build the dispatcher
    ///
    /// # Errors
    ///
    /// - `Error::Config` for a zero batch size or handler timeout
    /// - `Error::InvalidMethodName`, `Error::DuplicateMethod` or
    ///   `Error::InvalidSchema` for a rejected registration
    /// - `Error::Internal` if observability could not be initialized
    pub fn build(self) -> Result<Dispatcher> {
        if self.max_batch_size == Some(0) {
            return Err(Error::Config("max_batch_size must be at least 1".to_string()));
        }
        if self.handler_timeout == Some(Duration::ZERO) {
            return Err(Error::Config("handler_timeout must be non-zero".to_string()));
        }

        // Initialize observability if configured
        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            rpcbase_core::init_observability(config.clone())
                .map_err(|e| Error::Internal(format!("Failed to initialize observability: {}", e)))?;

            Some(DispatchMetrics::new(config.service_name))
        } else {
            None
        };

        let param_validator = match self.schema_validator {
            Some(validator) => ParamValidator::new(validator),
            None => ParamValidator::default(),
        };

        let registry = self.registry.unwrap_or_default();
        if let Some(service_info) = self.discovery {
            register_discovery(&registry, service_info)?;
        }
        for method in self.methods {
            if let Some(schema) = &method.param_schema {
                param_validator.check_schema(&method.name, schema)?;
            }
            registry.register(method.name, method.handler, method.param_schema)?;
        }

        let mut hooks = Vec::with_capacity(self.hooks.len() + 2);
        if let Some(timeout) = self.handler_timeout {
            hooks.push(Arc::new(TimeoutHook::new(timeout)) as Arc<dyn InvocationHook>);
        }
        hooks.extend(self.hooks);
        if let Some(token) = self.cancellation_token {
            hooks.push(Arc::new(CancellationHook::new(token)));
        }

        tracing::debug!(
            methods = registry.len(),
            batch_mode = self.batch_mode.as_str(),
            max_batch_size = ?self.max_batch_size,
            policy = ?self.notification_policy,
            hooks = hooks.len(),
            middleware = self.middleware_chain.len(),
            "Dispatcher built"
        );

        Ok(Dispatcher::from_parts(
            registry,
            param_validator,
            self.middleware_chain,
            hooks,
            BatchProcessor::with_limit(self.batch_mode, self.max_batch_size),
            self.notification_policy,
            metrics,
        ))
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
