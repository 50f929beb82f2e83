use super::*;
use crate::state::test_helpers::{message, seed_messages, test_app_state, test_app_state_failing_repo};
use uuid::Uuid;

#[test]
fn feed_error_to_status_maps_invalid_input_to_bad_request() {
    assert_eq!(feed_error_to_status(FeedError::InvalidMessage("x".into())), StatusCode::BAD_REQUEST);
    assert_eq!(feed_error_to_status(FeedError::InvalidQuery("x".into())), StatusCode::BAD_REQUEST);
}

#[test]
fn feed_error_to_status_maps_not_found() {
    assert_eq!(feed_error_to_status(FeedError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
}

#[test]
fn feed_error_to_status_maps_database() {
    let err = FeedError::Database(sqlx::Error::PoolTimedOut);
    assert_eq!(feed_error_to_status(err), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn list_messages_defaults_to_feed_window() {
    let state = test_app_state();
    let rows = (0..25).map(|i| message(&format!("m{i:02}"), i)).collect();
    seed_messages(&state, rows).await;

    let Json(listed) = list_messages(State(state), Query(ListParams::default())).await;

    assert_eq!(listed.len(), DEFAULT_FEED_LIMIT);
    assert_eq!(listed[0].id, "m24");
}

#[tokio::test]
async fn list_messages_honours_limit() {
    let state = test_app_state();
    seed_messages(&state, vec![message("a", 1), message("b", 2), message("c", 3)]).await;

    let Json(listed) = list_messages(State(state), Query(ListParams { limit: Some(2) })).await;

    let ids: Vec<_> = listed.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["c", "b"]);
}

#[tokio::test]
async fn create_message_returns_created() {
    let state = test_app_state();
    let body = NewMessage::from_form("Ada", "hello", 10);

    let (status, Json(stored)) = create_message(State(state.clone()), Json(body)).await.expect("create");

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored.text, "hello");
    assert_eq!(feed::recent(&state, 5).await, vec![stored]);
}

#[tokio::test]
async fn create_message_rejects_empty_text() {
    let state = test_app_state();
    let err = create_message(State(state), Json(NewMessage::from_form("", "  ", 1)))
        .await
        .expect_err("should reject");
    assert_eq!(err, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_message_surfaces_database_failure() {
    let state = test_app_state_failing_repo();
    let err = create_message(State(state), Json(NewMessage::from_form("", "hi", 1)))
        .await
        .expect_err("should fail");
    assert_eq!(err, StatusCode::INTERNAL_SERVER_ERROR);
}
