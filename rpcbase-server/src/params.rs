//! Parameter validation against registered schemas
//!
//! Runs after routing: a method registered without a schema accepts any
//! params, otherwise the params are handed to the configured
//! `SchemaValidator`. Absent params are validated as `null`, so a schema can
//! make params mandatory simply by not admitting `null`.
//!
//! A failure is reported as Invalid params (-32602) whose `data` is the list
//! of violations, each `{"message": ..., "path": [...]}`.

use crate::registry::MethodEntry;
use crate::schema::{violations_to_value, JsonSchemaValidator, SchemaValidator};
use rpcbase_core::{Error, JsonRpcErrorData, RequestEnvelope, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Checks request params against a method's schema
#[derive(Clone)]
pub struct ParamValidator {
    schema_validator: Arc<dyn SchemaValidator>,
}

impl ParamValidator {
    /// Create a param validator backed by the given schema capability
    pub fn new(schema_validator: Arc<dyn SchemaValidator>) -> Self {
        Self { schema_validator }
    }

    /// Validate the envelope's params against the entry's schema
    ///
    /// # Errors
    ///
    /// The Invalid params error to report when any violation is found.
    pub fn validate(
        &self,
        envelope: &RequestEnvelope,
        entry: &MethodEntry,
    ) -> std::result::Result<(), JsonRpcErrorData> {
        let Some(schema) = entry.param_schema() else {
            return Ok(());
        };

        let null = Value::Null;
        let params = envelope.params.as_ref().unwrap_or(&null);
        let violations = self.schema_validator.validate(params, schema);
        if violations.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            method = %entry.name(),
            violations = violations.len(),
            "Params rejected by schema"
        );
        Err(JsonRpcErrorData::invalid_params(violations_to_value(&violations)))
    }

    /// Check a schema before it is registered for `method`
    ///
    /// # Errors
    ///
    /// `Error::InvalidSchema` naming the method and the validator's reason.
    pub fn check_schema(&self, method: &str, schema: &Value) -> Result<()> {
        self.schema_validator
            .check_schema(schema)
            .map_err(|reason| Error::InvalidSchema {
                method: method.to_string(),
                reason,
            })
    }
}

impl Default for ParamValidator {
    fn default() -> Self {
        Self::new(Arc::new(JsonSchemaValidator::new()))
    }
}

impl fmt::Debug for ParamValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamValidator").finish_non_exhaustive()
    }
}
