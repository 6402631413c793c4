//! Integration tests for stream-driven live sets

use futures::stream;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use xui_live::{
    LiveSet, LiveSubscription, NotificationPolicy, Phase, SinkEvent, Snapshot, TransportError,
};
use xui_test_utils::{added_todo, ready, removed, RecordingSink, Todo};

fn ok(items: Vec<Value>) -> Vec<Result<Value, TransportError>> {
    items.into_iter().map(Ok).collect()
}

#[tokio::test]
async fn test_stream_is_applied_in_order() {
    let sink = RecordingSink::new();
    let live_set: LiveSet<Todo, _> = LiveSet::new(sink.clone(), NotificationPolicy::default());
    let items = ok(vec![
        added_todo("1", "milk"),
        added_todo("2", "eggs"),
        ready(),
        removed("1"),
    ]);

    let subscription = LiveSubscription::spawn(live_set, stream::iter(items));
    let live_set = subscription.join().await.unwrap();

    assert_eq!(live_set.phase(), Phase::Stopped);
    assert_eq!(sink.snapshot_count(), 2);
    assert_eq!(sink.last().unwrap().ids(), vec!["2".to_string()]);
}

#[tokio::test]
async fn test_transport_error_is_terminal() {
    let (tx, mut rx) = mpsc::unbounded_channel::<SinkEvent<Todo>>();
    let live_set = LiveSet::new(tx, NotificationPolicy::default());
    let items = vec![
        Ok(ready()),
        Err(TransportError::new("socket closed")),
        Ok(added_todo("1", "never applied")),
    ];

    let live_set = LiveSubscription::spawn(live_set, stream::iter(items))
        .join()
        .await
        .unwrap();

    assert!(live_set.is_stopped());
    assert!(live_set.is_empty());
    drop(live_set);
    assert!(matches!(rx.recv().await, Some(SinkEvent::Snapshot(s)) if s.is_empty()));
    assert!(matches!(rx.recv().await, Some(SinkEvent::Error(e)) if e.is_terminal()));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_stop_while_waiting_on_stream() {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Result<Value, TransportError>>();
    let (snap_tx, mut snap_rx) = watch::channel(Snapshot::<Todo>::default());
    let live_set = LiveSet::new(snap_tx, NotificationPolicy::default());
    let inbound = futures::stream::unfold(inbound_rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });

    let subscription = LiveSubscription::spawn(live_set, inbound);
    inbound_tx.send(Ok(ready())).unwrap();
    inbound_tx.send(Ok(added_todo("1", "milk"))).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while snap_rx.borrow_and_update().is_empty() {
            snap_rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    assert!(subscription.stop());
    assert!(!subscription.stop());
    let live_set = tokio::time::timeout(Duration::from_secs(5), subscription.join())
        .await
        .unwrap()
        .unwrap();

    let _ = inbound_tx.send(Ok(removed("1")));
    assert_eq!(live_set.len(), 1);
    assert_eq!(live_set.phase(), Phase::Stopped);
}

#[tokio::test]
async fn test_stop_signal_from_another_task() {
    let sink = RecordingSink::<Todo>::new();
    let live_set = LiveSet::new(sink.clone(), NotificationPolicy::default());
    let subscription = LiveSubscription::spawn(live_set, stream::pending::<Result<Value, TransportError>>());
    let signal = subscription.signal();

    tokio::spawn(async move { signal.stop() }).await.unwrap();

    let live_set = tokio::time::timeout(Duration::from_secs(5), subscription.join())
        .await
        .unwrap()
        .unwrap();
    assert!(live_set.is_stopped());
    assert_eq!(sink.snapshot_count(), 0);
}
