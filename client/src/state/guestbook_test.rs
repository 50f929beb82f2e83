use super::*;
use frames::feed::Change;

fn msg(id: &str, timestamp: i64) -> Message {
    Message { id: id.to_owned(), name: None, text: format!("text {id}"), timestamp }
}

fn delta(changes: Vec<Change>) -> ChangeBatch {
    ChangeBatch::delta(changes)
}

fn ids(state: &GuestbookState) -> Vec<&str> {
    state.messages.iter().map(|m| m.id.as_str()).collect()
}

// =============================================================
// apply_batch
// =============================================================

#[test]
fn default_state_is_loading_and_empty() {
    let state = GuestbookState::default();
    assert!(state.loading);
    assert!(state.messages.is_empty());
    assert_eq!(state.feed_view(), FeedView::Loading);
}

#[test]
fn empty_first_batch_ends_loading() {
    let mut state = GuestbookState::default();
    state.apply_batch(&ChangeBatch::snapshot(&[]));
    assert!(!state.loading);
    assert_eq!(state.feed_view(), FeedView::Empty);
}

#[test]
fn equal_timestamps_order_the_same_for_snapshot_and_deltas() {
    let mut from_deltas = GuestbookState::default();
    from_deltas.apply_batch(&delta(vec![Change::added(msg("a", 100))]));
    from_deltas.apply_batch(&delta(vec![Change::added(msg("c", 100))]));
    from_deltas.apply_batch(&delta(vec![Change::added(msg("b", 100))]));

    let mut from_snapshot = GuestbookState::default();
    from_snapshot.apply_batch(&ChangeBatch::snapshot(&[msg("b", 100), msg("a", 100), msg("c", 100)]));

    assert_eq!(ids(&from_deltas), ["c", "b", "a"]);
    assert_eq!(ids(&from_snapshot), ids(&from_deltas));
}

#[test]
fn later_batches_sort_newest_first() {
    let mut state = GuestbookState::default();
    state.apply_batch(&delta(vec![Change::added(msg("a", 100))]));
    state.apply_batch(&delta(vec![Change::added(msg("b", 200))]));
    assert_eq!(ids(&state), ["b", "a"]);
}

#[test]
fn unordered_batch_is_sorted_without_duplicates() {
    let mut state = GuestbookState::default();
    state.apply_batch(&delta(vec![
        Change::added(msg("a", 5)),
        Change::added(msg("b", 50)),
        Change::added(msg("a", 5)),
        Change::added(msg("c", 20)),
        Change::modified(msg("b", 50)),
    ]));
    assert_eq!(ids(&state), ["b", "c", "a"]);
}

#[test]
fn removed_for_absent_id_is_noop() {
    let mut state = GuestbookState::default();
    state.apply_batch(&delta(vec![Change::added(msg("a", 1))]));
    let before = state.messages.clone();

    state.apply_batch(&delta(vec![Change::removed(msg("zzz", 9))]));

    assert_eq!(state.messages, before);
}

#[test]
fn removed_drops_matching_entry() {
    let mut state = GuestbookState::default();
    state.apply_batch(&delta(vec![Change::added(msg("a", 1)), Change::added(msg("b", 2))]));
    state.apply_batch(&delta(vec![Change::removed(msg("a", 1))]));
    assert_eq!(ids(&state), ["b"]);
}

#[test]
fn added_then_modified_in_one_batch_keeps_modified_copy() {
    let mut state = GuestbookState::default();
    let mut edited = msg("a", 300);
    edited.text = "edited".into();

    state.apply_batch(&delta(vec![Change::added(msg("a", 100)), Change::modified(edited.clone())]));

    assert_eq!(state.messages, vec![edited]);
}

#[test]
fn modified_reorders_by_new_timestamp() {
    let mut state = GuestbookState::default();
    state.apply_batch(&delta(vec![Change::added(msg("a", 100)), Change::added(msg("b", 200))]));
    state.apply_batch(&delta(vec![Change::modified(msg("a", 300))]));
    assert_eq!(ids(&state), ["a", "b"]);
}

#[test]
fn reset_batch_replaces_view() {
    let mut state = GuestbookState::default();
    state.apply_batch(&delta(vec![Change::added(msg("old", 1))]));

    state.apply_batch(&ChangeBatch::snapshot(&[msg("x", 10), msg("y", 5)]));

    assert_eq!(ids(&state), ["x", "y"]);
}

// =============================================================
// Submission
// =============================================================

#[test]
fn blank_text_cannot_be_submitted() {
    let mut state = GuestbookState::default();
    assert!(!state.can_submit());
    state.draft.text = "   \n".into();
    assert!(!state.can_submit());
    assert_eq!(state.take_submission(1), None);
    assert_eq!(state.in_flight, 0);
}

#[test]
fn submission_clears_text_and_keeps_name() {
    let mut state = GuestbookState::default();
    state.draft = Draft { name: "Ada".into(), text: "hello".into() };

    let new = state.take_submission(1_234).expect("submittable");

    assert_eq!(new, NewMessage { name: Some("Ada".into()), text: "hello".into(), timestamp: 1_234 });
    assert_eq!(state.draft.text, "");
    assert_eq!(state.draft.name, "Ada");
    assert!(state.posting());
}

#[test]
fn name_is_submitted_exactly_as_typed() {
    let mut state = GuestbookState::default();
    state.draft = Draft { name: " Ada ".into(), text: "hi".into() };
    let new = state.take_submission(1).expect("submittable");
    assert_eq!(new.name.as_deref(), Some(" Ada "));
}

#[test]
fn blank_name_submits_null_name() {
    let mut state = GuestbookState::default();
    state.draft = Draft { name: "  ".into(), text: "hi".into() };
    let new = state.take_submission(1).expect("submittable");
    assert_eq!(new.name, None);
}

#[test]
fn submission_does_not_insert_locally() {
    let mut state = GuestbookState::default();
    state.apply_batch(&ChangeBatch::snapshot(&[]));
    state.draft.text = "hi".into();
    let _ = state.take_submission(1);
    assert!(state.messages.is_empty());
}

#[test]
fn finish_post_tracks_outcome() {
    let mut state = GuestbookState::default();
    state.draft.text = "a".into();
    let _ = state.take_submission(1);
    state.draft.text = "b".into();
    let _ = state.take_submission(2);
    assert_eq!(state.in_flight, 2);

    state.finish_post(Err("offline".into()));
    assert_eq!(state.last_error.as_deref(), Some("offline"));
    assert!(state.posting());

    state.finish_post(Ok(()));
    assert_eq!(state.last_error, None);
    assert!(!state.posting());
}

// =============================================================
// Render model
// =============================================================

#[test]
fn rows_use_anonymous_fallback_and_keep_raw_text() {
    let mut state = GuestbookState::default();
    let mut named = msg("n", 2_000);
    named.name = Some("Ada".into());
    let mut raw = msg("r", 1_000);
    raw.text = "<b>not html</b>".into();

    state.apply_batch(&ChangeBatch::snapshot(&[named, raw]));

    let FeedView::Messages(rows) = state.feed_view() else {
        panic!("expected message rows");
    };
    assert_eq!(rows[0].author, "Ada");
    assert_eq!(rows[1].author, ANONYMOUS);
    assert_eq!(rows[1].text, "<b>not html</b>");
    assert_eq!(rows[1].when, format_timestamp(1_000));
}
