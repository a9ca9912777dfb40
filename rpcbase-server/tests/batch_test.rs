//! Batch dispatch integration tests

use rpcbase_server::{from_fn, from_typed_fn, BatchMode, Dispatcher, DispatcherBuilder};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn dispatcher(mode: BatchMode) -> Dispatcher {
    DispatcherBuilder::new()
        .batch_mode(mode)
        .method(
            "add",
            from_typed_fn(|(a, b): (i64, i64)| async move { Ok(a + b) }),
        )
        .method(
            "sleep",
            from_typed_fn(|(ms,): (u64,)| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(ms)
            }),
        )
        .method(
            "explode",
            from_fn(|_| async {
                if true {
                    panic!("handler blew up");
                }
                Ok(Value::Null)
            }),
        )
        .build()
        .unwrap()
}

fn ids(reply: &Value) -> Vec<Value> {
    reply
        .as_array()
        .unwrap()
        .iter()
        .map(|response| response["id"].clone())
        .collect()
}

#[tokio::test]
async fn test_batch_with_notification() {
    let reply = dispatcher(BatchMode::Parallel)
        .dispatch(json!([
            {"jsonrpc": "2.0", "method": "add", "params": [1, 1], "id": 1},
            {"jsonrpc": "2.0", "method": "add", "params": [2, 2]}
        ]))
        .await;

    assert_eq!(reply, Some(json!([{"jsonrpc": "2.0", "result": 2, "id": 1}])));
}

#[tokio::test]
async fn test_parallel_batch_keeps_input_order() {
    let reply = dispatcher(BatchMode::Parallel)
        .dispatch(json!([
            {"jsonrpc": "2.0", "method": "sleep", "params": [60], "id": "slow"},
            {"jsonrpc": "2.0", "method": "sleep", "params": [0], "id": "fast"},
            {"jsonrpc": "2.0", "method": "sleep", "params": [10]},
            {"jsonrpc": "2.0", "method": "sleep", "params": [30], "id": "medium"}
        ]))
        .await
        .unwrap();

    assert_eq!(ids(&reply), vec![json!("slow"), json!("fast"), json!("medium")]);
}

#[tokio::test]
async fn test_mixed_batch() {
    let reply = dispatcher(BatchMode::Sequential)
        .dispatch(json!([
            {"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": 1},
            {"jsonrpc": "2.0", "method": "missing", "id": 2},
            1,
            {"jsonrpc": "1.0", "method": "add", "id": 3},
            {"jsonrpc": "2.0", "method": "missing"},
            {"foo": "bar"},
            {"jsonrpc": "2.0", "method": "add", "params": [3, 4], "id": 1}
        ]))
        .await
        .unwrap();

    let responses = reply.as_array().unwrap();
    assert_eq!(responses.len(), 6);

    assert_eq!(responses[0]["result"], 3);
    assert_eq!(responses[1]["error"]["code"], -32601);
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(responses[2]["error"]["code"], -32600);
    assert_eq!(responses[2]["id"], Value::Null);
    assert_eq!(responses[3]["error"]["code"], -32600);
    assert_eq!(responses[3]["id"], 3);
    assert_eq!(responses[4]["error"]["code"], -32600);
    assert_eq!(responses[4]["id"], Value::Null);
    // Duplicate ids are not deduplicated
    assert_eq!(responses[5]["result"], 7);
    assert_eq!(responses[5]["id"], 1);
}

#[tokio::test]
async fn test_empty_batch() {
    let reply = dispatcher(BatchMode::Parallel).dispatch(json!([])).await;

    assert_eq!(
        reply,
        Some(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32600,
                "message": "Invalid Request",
                "data": {"details": "Batch request array is empty"}
            },
            "id": null
        }))
    );
}

#[tokio::test]
async fn test_all_notifications_batch_has_no_reply() {
    let reply = dispatcher(BatchMode::Parallel)
        .dispatch(json!([
            {"jsonrpc": "2.0", "method": "add", "params": [1, 1]},
            {"jsonrpc": "2.0", "method": "missing"},
            {"jsonrpc": "2.0", "method": "explode"}
        ]))
        .await;

    assert_eq!(reply, None);
}

#[tokio::test]
async fn test_nested_batch_is_invalid_request() {
    let reply = dispatcher(BatchMode::Parallel)
        .dispatch(json!([[{"jsonrpc": "2.0", "method": "add", "params": [1, 1], "id": 1}]]))
        .await
        .unwrap();

    assert_eq!(reply.as_array().unwrap().len(), 1);
    assert_eq!(reply[0]["error"]["code"], -32600);
    assert_eq!(reply[0]["id"], Value::Null);
}

#[tokio::test]
async fn test_panicking_handler_does_not_affect_siblings() {
    for mode in [BatchMode::Parallel, BatchMode::Sequential] {
        let reply = dispatcher(mode)
            .dispatch(json!([
                {"jsonrpc": "2.0", "method": "add", "params": [1, 1], "id": 1},
                {"jsonrpc": "2.0", "method": "explode", "id": 2},
                {"jsonrpc": "2.0", "method": "add", "params": [2, 2], "id": 3}
            ]))
            .await
            .unwrap();

        assert_eq!(reply[0]["result"], 2);
        assert_eq!(reply[1]["error"]["code"], -32603);
        assert_eq!(reply[1]["id"], 2);
        assert_eq!(reply[2]["result"], 4);
    }
}

#[tokio::test]
async fn test_max_batch_size() {
    let dispatcher = DispatcherBuilder::new()
        .max_batch_size(2)
        .method("add", from_typed_fn(|(a, b): (i64, i64)| async move { Ok(a + b) }))
        .build()
        .unwrap();
    let call = json!({"jsonrpc": "2.0", "method": "add", "params": [1, 1], "id": 1});

    let reply = dispatcher
        .dispatch(json!([call.clone(), call.clone()]))
        .await
        .unwrap();
    assert_eq!(reply.as_array().unwrap().len(), 2);

    let reply = dispatcher
        .dispatch(json!([call.clone(), call.clone(), call]))
        .await
        .unwrap();
    assert!(reply.is_object());
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(reply["error"]["data"]["limit"], 2);
    assert_eq!(reply["error"]["data"]["actual"], 3);
    assert_eq!(reply["id"], Value::Null);
}

#[tokio::test]
async fn test_sequential_batch_runs_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&log);

    let dispatcher = DispatcherBuilder::new()
        .batch_mode(BatchMode::Sequential)
        .method(
            "record",
            from_typed_fn(move |(entry, delay): (String, u64)| {
                let log = Arc::clone(&recorder);
                async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    log.lock().unwrap().push(entry);
                    Ok(())
                }
            }),
        )
        .build()
        .unwrap();

    dispatcher
        .dispatch(json!([
            {"jsonrpc": "2.0", "method": "record", "params": ["first", 30]},
            {"jsonrpc": "2.0", "method": "record", "params": ["second", 0]},
            {"jsonrpc": "2.0", "method": "record", "params": ["third", 10]}
        ]))
        .await;

    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_dispatch_cancels_slots() {
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);
    let dispatcher = DispatcherBuilder::new()
        .method(
            "slow",
            from_fn(move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            }),
        )
        .build()
        .unwrap();

    let dispatch = dispatcher.dispatch(json!([
        {"jsonrpc": "2.0", "method": "slow", "id": 1},
        {"jsonrpc": "2.0", "method": "slow"}
    ]));
    assert!(tokio::time::timeout(Duration::from_millis(50), dispatch)
        .await
        .is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}
