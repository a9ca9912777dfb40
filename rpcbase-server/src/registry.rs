//! Method registry mapping names to handlers
//!
//! The registry is the only mutable state the engine owns. Each entry binds
//! a method name to its handler and an optional parameter schema. Entries
//! are immutable once registered; replacing one means deregistering it
//! first.
//!
//! # Concurrency
//!
//! The map sits behind an `RwLock`: any number of dispatches look methods up
//! concurrently, while a registration or deregistration takes the lock
//! exclusively. Lookups hand out `Arc<MethodEntry>` so the lock is never held
//! across a handler invocation.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::{from_fn, MethodRegistry};
//!
//! let registry = MethodRegistry::new();
//! registry.register("ping", from_fn(|_| async { Ok("pong".into()) }), None).unwrap();
//!
//! assert!(registry.has_method("ping"));
//! assert!(registry.register("ping", from_fn(|_| async { Ok("again".into()) }), None).is_err());
//! ```

use crate::handler::Handler;
use rpcbase_core::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A registered method
pub struct MethodEntry {
    name: String,
    handler: Arc<dyn Handler>,
    param_schema: Option<Value>,
}

impl MethodEntry {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handler invoked for the method
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Schema the params are checked against, if any
    pub fn param_schema(&self) -> Option<&Value> {
        self.param_schema.as_ref()
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("param_schema", &self.param_schema)
            .finish_non_exhaustive()
    }
}

/// Registry of JSON-RPC methods
#[derive(Default)]
pub struct MethodRegistry {
    methods: RwLock<HashMap<String, Arc<MethodEntry>>>,
}

impl MethodRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // Every write is a single insert or remove, so a poisoned map is still consistent
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<MethodEntry>>> {
        self.methods.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<MethodEntry>>> {
        self.methods.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler under `name`
    ///
    /// # Errors
    ///
    /// - `Error::InvalidMethodName` if `name` is empty
    /// - `Error::DuplicateMethod` if `name` is already registered
    pub fn register(
        &self,
        name: impl Into<String>,
        handler: Box<dyn Handler>,
        param_schema: Option<Value>,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidMethodName(name));
        }

        let mut methods = self.write();
        if methods.contains_key(&name) {
            return Err(Error::DuplicateMethod(name));
        }

        tracing::debug!(method = %name, has_schema = param_schema.is_some(), "Registered method");
        let entry = MethodEntry {
            name: name.clone(),
            handler: Arc::from(handler),
            param_schema,
        };
        methods.insert(name, Arc::new(entry));
        Ok(())
    }

    /// Look a method up by name
    ///
    /// # Errors
    ///
    /// `Error::MethodNotFound` when nothing is registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<Arc<MethodEntry>> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MethodNotFound(name.to_string()))
    }

    /// Remove a method, returning its entry if it was registered
    pub fn deregister(&self, name: &str) -> Option<Arc<MethodEntry>> {
        let removed = self.write().remove(name);
        if removed.is_some() {
            tracing::debug!(method = %name, "Deregistered method");
        }
        removed
    }

    /// Check if a method is registered
    pub fn has_method(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Registered method names in sorted order
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered methods
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no methods are registered
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Describe every method as `{name: {"params": schema | null}}`
    ///
    /// Names are emitted in sorted order.
    pub fn describe(&self) -> Value {
        let methods = self.read();
        let mut entries: Vec<&Arc<MethodEntry>> = methods.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut described = Map::new();
        for entry in entries {
            let mut info = Map::new();
            info.insert(
                "params".to_string(),
                entry.param_schema.clone().unwrap_or(Value::Null),
            );
            described.insert(entry.name.clone(), Value::Object(info));
        }
        Value::Object(described)
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{from_fn, RequestContext};
    use serde_json::json;

    fn ok_handler(value: Value) -> Box<dyn Handler> {
        from_fn(move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = MethodRegistry::new();
        registry
            .register("test", ok_handler(json!({"status": "ok"})), None)
            .unwrap();

        assert!(registry.has_method("test"));
        assert!(!registry.has_method("unknown"));

        let entry = registry.lookup("test").unwrap();
        assert_eq!(entry.name(), "test");
        assert!(entry.param_schema().is_none());

        let result = entry
            .handler()
            .handle(None, RequestContext::new("test", None))
            .await
            .unwrap();
        assert_eq!(result, json!({"status": "ok"}));
    }

    #[test]
    fn test_lookup_unknown_method() {
        let registry = MethodRegistry::new();
        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, Error::MethodNotFound(name) if name == "missing"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = MethodRegistry::new();
        registry.register("noop", ok_handler(json!(1)), None).unwrap();

        let err = registry.register("noop", ok_handler(json!(2)), None).unwrap_err();
        assert!(matches!(err, Error::DuplicateMethod(name) if name == "noop"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = MethodRegistry::new();
        let err = registry.register("", ok_handler(json!(1)), None).unwrap_err();
        assert!(matches!(err, Error::InvalidMethodName(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_deregister() {
        let registry = MethodRegistry::new();
        registry.register("gone", ok_handler(json!(1)), None).unwrap();

        assert!(registry.deregister("gone").is_some());
        assert!(registry.deregister("gone").is_none());
        assert!(!registry.has_method("gone"));

        // The name is free again once removed
        registry.register("gone", ok_handler(json!(2)), None).unwrap();
    }

    #[test]
    fn test_methods_sorted() {
        let registry = MethodRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(name, ok_handler(json!(null)), None).unwrap();
        }

        assert_eq!(registry.methods(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_describe() {
        let registry = MethodRegistry::new();
        registry
            .register("add", ok_handler(json!(0)), Some(json!({"type": "array"})))
            .unwrap();
        registry.register("ping", ok_handler(json!(0)), None).unwrap();

        assert_eq!(
            registry.describe(),
            json!({
                "add": {"params": {"type": "array"}},
                "ping": {"params": null}
            })
        );
    }
}
