//! Guestbook view state and change-batch reconciliation.
//!
//! DESIGN
//! ======
//! The local view is a bounded, ordered, duplicate-free copy of the newest
//! messages. Each incoming batch is applied to a working copy in delivery
//! order and committed in one step, so a `modified` change (remove then
//! insert) is never observable half-applied:
//!
//! - `removed` / `modified`: drop any entry with the same ID
//! - `added` / `modified`: insert the incoming record
//! - after the batch: sort newest first (ties by descending ID, the same
//!   order the feed service uses), loading done
//!
//! `added` also drops a previous entry with the same ID first, so a
//! re-delivered record replaces its old copy.

use frames::feed::{ChangeBatch, ChangeKind, Message, NewMessage, newest_first};

use crate::util::time::format_timestamp;

#[cfg(test)]
#[path = "guestbook_test.rs"]
mod guestbook_test;

/// Display name for messages posted without a name.
pub const ANONYMOUS: &str = "Anonymous";

/// Form inputs not yet submitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuestbookState {
    /// Newest first.
    pub messages: Vec<Message>,
    /// True until the first batch arrives.
    pub loading: bool,
    pub draft: Draft,
    /// Create requests still waiting for an answer.
    pub in_flight: usize,
    /// Reason the most recent failed post was rejected.
    pub last_error: Option<String>,
}

impl Default for GuestbookState {
    fn default() -> Self {
        Self { messages: Vec::new(), loading: true, draft: Draft::default(), in_flight: 0, last_error: None }
    }
}

impl GuestbookState {
    /// Apply one change batch atomically.
    pub fn apply_batch(&mut self, batch: &ChangeBatch) {
        let mut working = if batch.reset { Vec::new() } else { self.messages.clone() };

        for change in &batch.changes {
            let incoming = &change.message;
            working.retain(|m| m.id != incoming.id);
            match change.kind {
                ChangeKind::Added | ChangeKind::Modified => working.push(incoming.clone()),
                ChangeKind::Removed => {}
            }
        }

        working.sort_by(newest_first);
        self.messages = working;
        self.loading = false;
    }

    /// The post control is enabled only for non-blank text.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.draft.text.trim().is_empty()
    }

    #[must_use]
    pub fn posting(&self) -> bool {
        self.in_flight > 0
    }

    /// Turn the draft into a create request and clear the text input.
    ///
    /// Returns `None` when the text is blank. The name is kept for the next
    /// post.
    pub fn take_submission(&mut self, now_ms: i64) -> Option<NewMessage> {
        if !self.can_submit() {
            return None;
        }
        let text = std::mem::take(&mut self.draft.text);
        self.in_flight += 1;
        Some(NewMessage::from_form(&self.draft.name, &text, now_ms))
    }

    /// Record the outcome of a create request.
    pub fn finish_post(&mut self, result: Result<(), String>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(()) => self.last_error = None,
            Err(reason) => self.last_error = Some(reason),
        }
    }

    /// What the message list should show.
    #[must_use]
    pub fn feed_view(&self) -> FeedView {
        if self.loading {
            return FeedView::Loading;
        }
        if self.messages.is_empty() {
            return FeedView::Empty;
        }
        FeedView::Messages(self.messages.iter().map(MessageRow::from).collect())
    }
}

/// Render model of the message list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedView {
    Loading,
    Empty,
    Messages(Vec<MessageRow>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRow {
    pub id: String,
    pub when: String,
    pub author: String,
    pub text: String,
}

impl From<&Message> for MessageRow {
    fn from(message: &Message) -> Self {
        let author = message
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(ANONYMOUS);
        Self {
            id: message.id.clone(),
            when: format_timestamp(message.timestamp),
            author: author.to_owned(),
            text: message.text.clone(),
        }
    }
}
