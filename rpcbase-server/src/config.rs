//! Dispatcher configuration
//!
//! The tunables that do not involve code (handlers, hooks, middleware) can
//! come from a file or the environment as a `DispatcherConfig` and be handed
//! to `DispatcherBuilder::config`.
//!
//! # JSON
//!
//! ```rust
//! use rpcbase_server::{BatchMode, DispatcherConfig};
//!
//! let config = DispatcherConfig::from_json(r#"{"batch_mode": "sequential", "max_batch_size": 50}"#).unwrap();
//! assert_eq!(config.batch_mode, BatchMode::Sequential);
//! assert_eq!(config.max_batch_size, Some(50));
//! ```
//!
//! # Environment Variables
//!
//! - `RPCBASE_BATCH_MODE`: `parallel` or `sequential`
//! - `RPCBASE_MAX_BATCH_SIZE`: positive integer
//! - `RPCBASE_NOTIFICATION_POLICY`: `suppress_all` or `report_invalid_request`
//! - `RPCBASE_HANDLER_TIMEOUT_MS`: positive integer

use crate::batch::BatchMode;
use rpcbase_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_BATCH_MODE: &str = "RPCBASE_BATCH_MODE";
pub const ENV_MAX_BATCH_SIZE: &str = "RPCBASE_MAX_BATCH_SIZE";
pub const ENV_NOTIFICATION_POLICY: &str = "RPCBASE_NOTIFICATION_POLICY";
pub const ENV_HANDLER_TIMEOUT_MS: &str = "RPCBASE_HANDLER_TIMEOUT_MS";

/// Which failed notifications still get a response
///
/// Regardless of policy, a candidate that is not an object, or an object
/// carrying none of the envelope members, is always answered: there is no
/// way to tell that it was meant as a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
    /// Never answer a notification, whatever went wrong
    #[default]
    SuppressAll,
    /// Answer notifications whose envelope is malformed with an Invalid
    /// Request error (id null); routing, params and handler failures are
    /// still suppressed
    ReportInvalidRequest,
}

impl FromStr for NotificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suppress_all" => Ok(NotificationPolicy::SuppressAll),
            "report_invalid_request" => Ok(NotificationPolicy::ReportInvalidRequest),
            other => Err(format!("unknown notification policy {:?}", other)),
        }
    }
}

/// Serializable dispatcher settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// How batch candidates run
    pub batch_mode: BatchMode,
    /// Largest accepted batch, unlimited when absent
    pub max_batch_size: Option<usize>,
    /// Which failed notifications are answered
    pub notification_policy: NotificationPolicy,
    /// Per-handler time limit in milliseconds, none when absent
    pub handler_timeout_ms: Option<u64>,
}

impl DispatcherConfig {
    /// Parse a configuration from JSON text
    ///
    /// Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from `RPCBASE_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup(ENV_BATCH_MODE) {
            config.batch_mode = mode
                .parse()
                .map_err(|e| Error::Config(format!("{}: {}", ENV_BATCH_MODE, e)))?;
        }
        if let Some(size) = lookup(ENV_MAX_BATCH_SIZE) {
            config.max_batch_size = Some(parse_number(ENV_MAX_BATCH_SIZE, &size)?);
        }
        if let Some(policy) = lookup(ENV_NOTIFICATION_POLICY) {
            config.notification_policy = policy
                .parse()
                .map_err(|e| Error::Config(format!("{}: {}", ENV_NOTIFICATION_POLICY, e)))?;
        }
        if let Some(timeout) = lookup(ENV_HANDLER_TIMEOUT_MS) {
            config.handler_timeout_ms = Some(parse_number(ENV_HANDLER_TIMEOUT_MS, &timeout)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Handler time limit as a duration
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<()> {
        if self.max_batch_size == Some(0) {
            return Err(Error::Config("max_batch_size must be at least 1".to_string()));
        }
        if self.handler_timeout_ms == Some(0) {
            return Err(Error::Config("handler_timeout_ms must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}: {:?} is not a valid number: {}", key, raw, e)))
}
