//! Batch processing for JSON-RPC payloads
//!
//! A batch is a JSON array of candidates processed independently. This module
//! decides how the candidates run and puts their outcomes back in input
//! order; what happens to one candidate is the dispatcher's business.
//!
//! # Batch Modes
//!
//! - **Parallel**: each candidate runs on its own tokio task; dropping the
//!   batch future aborts the tasks still running
//! - **Sequential**: candidates run one after another, in order
//!
//! In both modes the outcome for slot `i` lands at index `i`, whatever order
//! the candidates finished in.
//!
//! # Size Limiting
//!
//! An optional maximum batch size guards against oversized payloads. A batch
//! over the limit is answered with one Invalid Request error instead.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::{BatchMode, BatchProcessor};
//!
//! let processor = BatchProcessor::with_limit(BatchMode::Parallel, Some(100));
//! assert!(processor.check_size(100).is_ok());
//! assert!(processor.check_size(101).is_err());
//! ```

use rpcbase_core::{Id, JsonRpcErrorData, Outcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::str::FromStr;
use tokio::task::JoinSet;

/// Mode for processing batch candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Run every candidate concurrently
    #[default]
    Parallel,
    /// Run candidates one at a time in input order
    ///
    /// Use this when later calls depend on the effects of earlier ones.
    Sequential,
}

impl BatchMode {
    /// Label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            BatchMode::Parallel => "parallel",
            BatchMode::Sequential => "sequential",
        }
    }
}

impl FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(BatchMode::Parallel),
            "sequential" => Ok(BatchMode::Sequential),
            other => Err(format!("unknown batch mode {:?}", other)),
        }
    }
}

/// Runs batch candidates and reassembles their outcomes
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchProcessor {
    mode: BatchMode,
    max_size: Option<usize>,
}

impl BatchProcessor {
    /// Create a batch processor with the specified mode and no size limit
    pub fn new(mode: BatchMode) -> Self {
        Self { mode, max_size: None }
    }

    /// Create a batch processor with mode and max batch size
    pub fn with_limit(mode: BatchMode, max_size: Option<usize>) -> Self {
        Self { mode, max_size }
    }

    /// Processing mode
    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Maximum accepted batch size, if limited
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Check a batch length against the configured limit
    ///
    /// # Errors
    ///
    /// The Invalid Request error to answer an oversized batch with.
    pub fn check_size(&self, size: usize) -> Result<(), JsonRpcErrorData> {
        match self.max_size {
            Some(max_size) if size > max_size => {
                tracing::warn!(batch_size = size, max_size, "Batch size exceeded");
                Err(JsonRpcErrorData::batch_size_exceeded(max_size, size))
            }
            _ => Ok(()),
        }
    }

    /// Run `process_one` over every candidate, returning one outcome per slot
    #[tracing::instrument(
        skip(self, candidates, process_one),
        fields(batch_size = candidates.len(), mode = self.mode.as_str())
    )]
    pub async fn process<F, Fut>(&self, candidates: Vec<Value>, process_one: F) -> Vec<Outcome>
    where
        F: Fn(Value) -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let outcomes = match self.mode {
            BatchMode::Parallel => Self::process_parallel(candidates, process_one).await,
            BatchMode::Sequential => Self::process_sequential(candidates, process_one).await,
        };

        tracing::debug!(
            responses = outcomes.iter().filter(|o| !o.is_suppressed()).count(),
            "Batch processing completed"
        );
        outcomes
    }

    async fn process_parallel<F, Fut>(candidates: Vec<Value>, process_one: F) -> Vec<Outcome>
    where
        F: Fn(Value) -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        // Slots keep their fallback if the task fails before reporting
        let mut outcomes: Vec<Outcome> = candidates.iter().map(task_failure_outcome).collect();

        // Dropping the set aborts whatever is still running
        let mut tasks = JoinSet::new();
        for (slot, candidate) in candidates.into_iter().enumerate() {
            let outcome = process_one(candidate);
            tasks.spawn(async move { (slot, outcome.await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => outcomes[slot] = outcome,
                Err(e) => tracing::error!(error = %e, "Batch task failed"),
            }
        }
        outcomes
    }

    async fn process_sequential<F, Fut>(candidates: Vec<Value>, process_one: F) -> Vec<Outcome>
    where
        F: Fn(Value) -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let mut outcomes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            outcomes.push(process_one(candidate).await);
        }
        outcomes
    }
}

/// Outcome for a slot whose task died without producing one
fn task_failure_outcome(candidate: &Value) -> Outcome {
    match candidate.as_object() {
        Some(object) if !object.contains_key("id") => Outcome::Suppressed,
        _ => Outcome::Failure {
            id: candidate.get("id").and_then(Id::from_value).unwrap_or(Id::Null),
            error: JsonRpcErrorData::internal_error("Batch task failed before producing a response"),
        },
    }
}
