//! Response assembly from outcomes
//!
//! Turns per-candidate outcomes into response objects. Suppressed outcomes
//! produce nothing; a batch whose outcomes were all suppressed produces no
//! reply at all rather than an empty array.

use rpcbase_core::{JsonRpcResponse, Outcome};
use serde_json::Value;

/// Builds response objects from outcomes
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Build the response for one outcome, `None` when suppressed
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rpcbase_core::{Id, Outcome};
    /// use rpcbase_server::ResponseBuilder;
    /// use serde_json::json;
    ///
    /// let response = ResponseBuilder::build(Outcome::Success { id: Id::from(1i64), result: json!(5) });
    /// assert!(response.unwrap().is_success());
    /// assert!(ResponseBuilder::build(Outcome::Suppressed).is_none());
    /// ```
    pub fn build(outcome: Outcome) -> Option<JsonRpcResponse> {
        match outcome {
            Outcome::Success { id, result } => Some(JsonRpcResponse::success(result, id)),
            Outcome::Failure { id, error } => Some(JsonRpcResponse::error(error, id)),
            Outcome::Suppressed => None,
        }
    }

    /// Build the reply for a single (non-batch) payload
    pub fn single(outcome: Outcome) -> Option<Value> {
        Self::build(outcome).map(Value::from)
    }

    /// Build the reply for a batch payload
    ///
    /// Responses keep the relative order of their outcomes.
    pub fn batch(outcomes: Vec<Outcome>) -> Option<Value> {
        let responses: Vec<Value> = outcomes
            .into_iter()
            .filter_map(Self::build)
            .map(Value::from)
            .collect();

        if responses.is_empty() {
            None
        } else {
            Some(Value::Array(responses))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpcbase_core::{Id, JsonRpcErrorData};
    use serde_json::json;

    #[test]
    fn test_build_failure() {
        let response = ResponseBuilder::build(Outcome::Failure {
            id: Id::from("a"),
            error: JsonRpcErrorData::method_not_found("nope", vec![]),
        })
        .unwrap();

        assert!(response.is_error());
        assert!(response.result.is_none());
        assert_eq!(response.id, Id::from("a"));
    }

    #[test]
    fn test_single_reply() {
        assert_eq!(
            ResponseBuilder::single(Outcome::Success {
                id: Id::from(1i64),
                result: json!(5)
            }),
            Some(json!({"jsonrpc": "2.0", "result": 5, "id": 1}))
        );
        assert_eq!(ResponseBuilder::single(Outcome::Suppressed), None);
    }

    #[test]
    fn test_batch_reply_filters_suppressed_and_keeps_order() {
        let outcomes = vec![
            Outcome::Success { id: Id::from(1i64), result: json!("a") },
            Outcome::Suppressed,
            Outcome::Failure { id: Id::Null, error: JsonRpcErrorData::invalid_request("x") },
            Outcome::Success { id: Id::from(3i64), result: json!("c") },
        ];

        let reply = ResponseBuilder::batch(outcomes).unwrap();
        let ids: Vec<Value> = reply.as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), Value::Null, json!(3)]);
    }

    #[test]
    fn test_all_suppressed_batch_has_no_reply() {
        assert_eq!(
            ResponseBuilder::batch(vec![Outcome::Suppressed, Outcome::Suppressed]),
            None
        );
    }
}
