use super::*;
use crate::frame::{Data, ErrorCode, Status};
use crate::state::test_helpers::{
    message, seed_messages, test_app_state, test_app_state_failing_repo, test_app_state_with_history,
};
use frames::feed::{ChangeKind, DEFAULT_FEED_LIMIT, MAX_TEXT_CHARS};
use tokio::time::{Duration, timeout};

fn subscribe_request(limit: usize) -> Frame {
    let data = data_from_value(FeedQuery::recent_messages(limit).to_value());
    Frame::request("feed:subscribe", data).with_collection("messages")
}

async fn recv_batch(rx: &mut mpsc::Receiver<Frame>) -> (Frame, ChangeBatch) {
    let frame = timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("batch receive timed out")
        .expect("subscriber channel closed");
    let batch = serde_json::from_value(frame.data_value()).expect("item carries a batch");
    (frame, batch)
}

/// A quiet queue and a closed one both mean nothing was delivered.
async fn assert_no_batch(rx: &mut mpsc::Receiver<Frame>) {
    match timeout(Duration::from_millis(50), rx.recv()).await {
        Err(_) | Ok(None) => {}
        Ok(Some(frame)) => panic!("expected no batch, got {frame:?}"),
    }
}

fn ids(changes: &[Change]) -> Vec<(ChangeKind, &str)> {
    changes.iter().map(|c| (c.kind, c.message.id.as_str())).collect()
}

// =============================================================
// window_changes
// =============================================================

#[test]
fn window_changes_new_message_in_full_window_adds_and_removes() {
    let before = vec![message("c", 3), message("b", 2)];
    let after = vec![message("d", 4), message("c", 3)];
    let changes = window_changes(&before, &after);
    assert_eq!(ids(&changes), [(ChangeKind::Removed, "b"), (ChangeKind::Added, "d")]);
}

#[test]
fn window_changes_identical_windows_are_empty() {
    let window = vec![message("b", 2), message("a", 1)];
    assert!(window_changes(&window, &window).is_empty());
}

#[test]
fn window_changes_detects_modified_content() {
    let before = vec![message("a", 1)];
    let mut edited = message("a", 1);
    edited.text = "edited".into();
    let changes = window_changes(&before, &[edited]);
    assert_eq!(ids(&changes), [(ChangeKind::Modified, "a")]);
    assert_eq!(changes[0].message.text, "edited");
}

#[test]
fn window_changes_from_empty_is_all_added() {
    let changes = window_changes(&[], &[message("b", 2), message("a", 1)]);
    assert_eq!(ids(&changes), [(ChangeKind::Added, "b"), (ChangeKind::Added, "a")]);
}

// =============================================================
// parse_query
// =============================================================

#[test]
fn parse_query_accepts_recent_messages() {
    let query = parse_query(&subscribe_request(DEFAULT_FEED_LIMIT)).expect("query");
    assert_eq!(query.limit, 20);
}

#[test]
fn parse_query_rejects_missing_fields_and_other_shapes() {
    let err = parse_query(&Frame::request("feed:subscribe", Data::new())).expect_err("should fail");
    assert_eq!(err.error_code(), "E_INVALID_QUERY");

    let mut query = FeedQuery::recent_messages(20);
    query.order_by = "name".into();
    let req = Frame::request("feed:subscribe", data_from_value(query.to_value()));
    assert!(matches!(parse_query(&req), Err(FeedError::InvalidQuery(_))));
}

// =============================================================
// subscribe / unsubscribe
// =============================================================

#[tokio::test]
async fn subscribe_returns_snapshot_of_window() {
    let state = test_app_state();
    seed_messages(&state, vec![message("a", 1), message("b", 2), message("c", 3)]).await;
    let (tx, _rx) = mpsc::channel(8);

    let batch = subscribe(&state, Uuid::new_v4(), &subscribe_request(2), tx).await.expect("subscribe");

    assert!(batch.reset);
    assert_eq!(ids(&batch.changes), [(ChangeKind::Added, "c"), (ChangeKind::Added, "b")]);
    assert_eq!(state.feed.read().await.subscribers.len(), 1);
}

#[tokio::test]
async fn subscribe_on_empty_feed_is_empty_reset() {
    let state = test_app_state();
    let (tx, _rx) = mpsc::channel(8);
    let batch = subscribe(&state, Uuid::new_v4(), &subscribe_request(20), tx).await.expect("subscribe");
    assert!(batch.reset);
    assert!(batch.changes.is_empty());
}

#[tokio::test]
async fn subscribe_clamps_limit_to_history() {
    let state = test_app_state_with_history(3);
    let client = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);
    let req = subscribe_request(500);
    subscribe(&state, client, &req, tx).await.expect("subscribe");
    assert_eq!(state.feed.read().await.subscribers[&(client, req.id)].limit, 3);
}

#[tokio::test]
async fn subscribe_twice_on_one_connection_is_rejected() {
    let state = test_app_state();
    let client = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);
    let req = subscribe_request(20);
    subscribe(&state, client, &req, tx.clone()).await.expect("first subscribe");
    let err = subscribe(&state, client, &req, tx).await.expect_err("second subscribe");
    assert!(matches!(err, FeedError::InvalidQuery(_)));
}

#[tokio::test]
async fn resubscribe_from_new_connection_while_old_one_lingers() {
    let state = test_app_state();
    let old_conn = Uuid::new_v4();
    let new_conn = Uuid::new_v4();
    let (old_tx, mut old_rx) = mpsc::channel(8);
    let (new_tx, mut new_rx) = mpsc::channel(8);
    let req = subscribe_request(20);

    subscribe(&state, old_conn, &req, old_tx).await.expect("old connection");
    let batch = subscribe(&state, new_conn, &req, new_tx).await.expect("new connection, same request id");
    assert!(batch.reset);
    assert_eq!(state.feed.read().await.subscribers.len(), 2);

    publish(&state, message("a", 1)).await;
    let (_, batch) = recv_batch(&mut new_rx).await;
    assert_eq!(ids(&batch.changes), [(ChangeKind::Added, "a")]);
    recv_batch(&mut old_rx).await;

    assert_eq!(drop_client(&state, old_conn).await, 1);
    publish(&state, message("b", 2)).await;
    let (_, batch) = recv_batch(&mut new_rx).await;
    assert_eq!(ids(&batch.changes), [(ChangeKind::Added, "b")]);
}

#[tokio::test]
async fn unsubscribe_requires_owner() {
    let state = test_app_state();
    let owner = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);
    let req = subscribe_request(20);
    subscribe(&state, owner, &req, tx).await.expect("subscribe");

    let err = unsubscribe(&state, Uuid::new_v4(), req.id).await.expect_err("foreign cancel");
    assert!(matches!(err, FeedError::NotFound(_)));

    let removed = unsubscribe(&state, owner, req.id).await.expect("owner cancel");
    assert_eq!(removed.request.id, req.id);
    assert!(state.feed.read().await.subscribers.is_empty());
}

#[tokio::test]
async fn drop_client_removes_only_that_clients_subscriptions() {
    let state = test_app_state();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);
    subscribe(&state, a, &subscribe_request(20), tx.clone()).await.expect("a1");
    subscribe(&state, a, &subscribe_request(5), tx.clone()).await.expect("a2");
    subscribe(&state, b, &subscribe_request(20), tx).await.expect("b1");

    assert_eq!(drop_client(&state, a).await, 2);
    let feed = state.feed.read().await;
    assert_eq!(feed.subscribers.len(), 1);
    assert!(feed.subscribers.values().all(|s| s.client_id == b));
}

// =============================================================
// publish / create
// =============================================================

#[tokio::test]
async fn publish_pushes_delta_as_item_on_subscribe_request() {
    let state = test_app_state();
    let (tx, mut rx) = mpsc::channel(8);
    let req = subscribe_request(20);
    subscribe(&state, Uuid::new_v4(), &req, tx).await.expect("subscribe");

    assert_eq!(publish(&state, message("a", 100)).await, 1);

    let (frame, batch) = recv_batch(&mut rx).await;
    assert_eq!(frame.status, Status::Item);
    assert_eq!(frame.parent_id, Some(req.id));
    assert!(!batch.reset);
    assert_eq!(ids(&batch.changes), [(ChangeKind::Added, "a")]);
}

#[tokio::test]
async fn publish_into_full_window_evicts_oldest() {
    let state = test_app_state();
    seed_messages(&state, vec![message("a", 1), message("b", 2)]).await;
    let (tx, mut rx) = mpsc::channel(8);
    subscribe(&state, Uuid::new_v4(), &subscribe_request(2), tx).await.expect("subscribe");

    publish(&state, message("c", 3)).await;

    let (_, batch) = recv_batch(&mut rx).await;
    assert_eq!(ids(&batch.changes), [(ChangeKind::Removed, "a"), (ChangeKind::Added, "c")]);
}

#[tokio::test]
async fn publish_older_than_window_tail_notifies_nobody() {
    let state = test_app_state();
    seed_messages(&state, vec![message("b", 20), message("c", 30)]).await;
    let (tx, mut rx) = mpsc::channel(8);
    subscribe(&state, Uuid::new_v4(), &subscribe_request(2), tx).await.expect("subscribe");

    assert_eq!(publish(&state, message("old", 5)).await, 0);
    assert_no_batch(&mut rx).await;
    assert_eq!(state.feed.read().await.recent.len(), 3);
}

#[tokio::test]
async fn publish_same_id_replaces_and_reports_modified() {
    let state = test_app_state();
    seed_messages(&state, vec![message("a", 1)]).await;
    let (tx, mut rx) = mpsc::channel(8);
    subscribe(&state, Uuid::new_v4(), &subscribe_request(20), tx).await.expect("subscribe");

    let mut edited = message("a", 1);
    edited.text = "edited".into();
    publish(&state, edited).await;

    let (_, batch) = recv_batch(&mut rx).await;
    assert_eq!(ids(&batch.changes), [(ChangeKind::Modified, "a")]);
    assert_eq!(state.feed.read().await.recent.len(), 1);
}

#[tokio::test]
async fn publish_respects_history_capacity() {
    let state = test_app_state_with_history(2);
    for (i, id) in ["a", "b", "c"].iter().enumerate() {
        publish(&state, message(id, i64::try_from(i).unwrap_or_default())).await;
    }
    let feed = state.feed.read().await;
    let ids: Vec<_> = feed.recent.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["c", "b"]);
}

#[tokio::test]
async fn publish_drops_subscribers_with_closed_queues() {
    let state = test_app_state();
    let (tx, rx) = mpsc::channel(8);
    subscribe(&state, Uuid::new_v4(), &subscribe_request(20), tx).await.expect("subscribe");
    drop(rx);

    assert_eq!(publish(&state, message("a", 1)).await, 0);
    assert!(state.feed.read().await.subscribers.is_empty());
}

#[tokio::test]
async fn cancelled_subscription_stops_receiving_others_continue() {
    let state = test_app_state();
    let a = Uuid::new_v4();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    let req_a = subscribe_request(20);
    subscribe(&state, a, &req_a, tx_a).await.expect("a");
    subscribe(&state, Uuid::new_v4(), &subscribe_request(20), tx_b).await.expect("b");

    unsubscribe(&state, a, req_a.id).await.expect("cancel");
    publish(&state, message("x", 1)).await;

    assert_no_batch(&mut rx_a).await;
    let (_, batch) = recv_batch(&mut rx_b).await;
    assert_eq!(ids(&batch.changes), [(ChangeKind::Added, "x")]);
}

#[tokio::test]
async fn create_persists_then_publishes() {
    let state = test_app_state();
    let (tx, mut rx) = mpsc::channel(8);
    subscribe(&state, Uuid::new_v4(), &subscribe_request(20), tx).await.expect("subscribe");

    let stored = create(&state, NewMessage::from_form("Ada", "hello", 42)).await.expect("create");

    assert!(Uuid::parse_str(&stored.id).is_ok());
    assert_eq!(stored.name.as_deref(), Some("Ada"));
    assert_eq!(stored.timestamp, 42);
    assert_eq!(state.repo.recent(10).await.expect("repo").len(), 1);

    let (_, batch) = recv_batch(&mut rx).await;
    assert_eq!(batch.changes[0].message, stored);
}

#[tokio::test]
async fn create_stores_whitespace_name_as_absent() {
    let state = test_app_state();
    let raw = NewMessage { name: Some("   ".into()), text: "hi".into(), timestamp: 7 };

    let stored = create(&state, raw).await.expect("create");

    assert_eq!(stored.name, None);
}

#[tokio::test]
async fn create_stores_name_exactly_as_entered() {
    let state = test_app_state();
    let raw = NewMessage { name: Some(" Ada  ".into()), text: "hi".into(), timestamp: 7 };

    let stored = create(&state, raw).await.expect("create");

    assert_eq!(stored.name.as_deref(), Some(" Ada  "));
}

#[tokio::test]
async fn create_rejects_invalid_message_without_storing() {
    let state = test_app_state();
    let long = "x".repeat(MAX_TEXT_CHARS + 1);

    for new in [NewMessage::from_form("", "", 1), NewMessage::from_form("", &long, 1)] {
        let err = create(&state, new).await.expect_err("should reject");
        assert_eq!(err.error_code(), "E_INVALID_MESSAGE");
    }
    assert!(state.repo.recent(10).await.expect("repo").is_empty());
    assert!(state.feed.read().await.recent.is_empty());
}

#[tokio::test]
async fn create_database_failure_is_retryable_and_not_published() {
    let state = test_app_state_failing_repo();
    let err = create(&state, NewMessage::from_form("", "hi", 1)).await.expect_err("should fail");
    assert_eq!(err.error_code(), "E_DATABASE");
    assert!(err.retryable());
    assert!(state.feed.read().await.recent.is_empty());
}

#[tokio::test]
async fn hydrate_loads_newest_from_repo() {
    let state = test_app_state_with_history(2);
    for (id, ts) in [("a", 1), ("b", 2), ("c", 3)] {
        state
            .repo
            .insert(Uuid::new_v4(), &NewMessage::from_form(id, "t", ts))
            .await
            .expect("insert");
    }

    assert_eq!(hydrate(&state).await.expect("hydrate"), 2);
    let recent = recent(&state, 20).await;
    let names: Vec<_> = recent.iter().filter_map(|m| m.name.as_deref()).collect();
    assert_eq!(names, ["c", "b"]);
}

#[tokio::test]
async fn hydrate_surfaces_database_errors() {
    let state = test_app_state_failing_repo();
    assert!(matches!(hydrate(&state).await, Err(FeedError::Database(_))));
}
