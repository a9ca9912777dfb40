//! Built-in `rpc.discover` method
//!
//! When enabled on the builder, the dispatcher answers `rpc.discover` with a
//! description of itself:
//!
//! ```json
//! {
//!   "service_info": {"name": "billing", "version": "1.4.0"},
//!   "methods": {
//!     "add": {"params": {"type": "array"}},
//!     "rpc.discover": {"params": {"type": "null"}}
//!   }
//! }
//! ```
//!
//! Methods are listed in sorted order with the schema they were registered
//! with, or `null` when they accept anything.

use crate::handler::{Handler, HandlerResult, RequestContext};
use crate::registry::MethodRegistry;
use rpcbase_core::Error;
use serde_json::{json, Value};
use std::sync::{Arc, Weak};

/// Method name the discovery handler is registered under
pub const DISCOVER_METHOD: &str = "rpc.discover";

/// Params schema of `rpc.discover`: it takes no params
pub fn discover_params_schema() -> Value {
    json!({"type": "null"})
}

/// Handler describing the registry it is registered in
///
/// Holds the registry weakly since the registry owns the handler.
pub(crate) struct DiscoveryHandler {
    registry: Weak<MethodRegistry>,
    service_info: Value,
}

impl DiscoveryHandler {
    pub(crate) fn new(registry: &Arc<MethodRegistry>, service_info: Value) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            service_info,
        }
    }
}

impl Handler for DiscoveryHandler {
    fn handle(&self, _params: Option<Value>, _ctx: RequestContext) -> HandlerResult {
        let document = self.registry.upgrade().map(|registry| {
            json!({
                "service_info": self.service_info.clone(),
                "methods": registry.describe(),
            })
        });

        Box::pin(async move {
            document.ok_or_else(|| Error::Internal("method registry is no longer available".to_string()))
        })
    }
}

/// Register `rpc.discover` in `registry`
pub(crate) fn register_discovery(registry: &Arc<MethodRegistry>, service_info: Value) -> rpcbase_core::Result<()> {
    tracing::debug!(method = DISCOVER_METHOD, "Enabling service discovery");
    registry.register(
        DISCOVER_METHOD,
        Box::new(DiscoveryHandler::new(registry, service_info)),
        Some(discover_params_schema()),
    )
}
