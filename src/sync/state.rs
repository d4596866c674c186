use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::models::conversations::{ConversationSummary, LatestMessage, sort_summaries};
use crate::models::messages::{MessageResponse, MessageType};

/// A send that has been submitted but not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub local_id: Uuid,
    pub conversation_id: Uuid,
    pub message: String,
    pub message_type: MessageType,
    pub queued_at: DateTime<Utc>,
}

impl PendingMessage {
    pub fn text(conversation_id: Uuid, message: String) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            conversation_id,
            message,
            message_type: MessageType::Text,
            queued_at: Utc::now(),
        }
    }
}

/// Everything the chat views render.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub conversations: Vec<ConversationSummary>,
    pub selected: Option<Uuid>,
    pub messages: Vec<MessageResponse>,
    pub pending: Vec<PendingMessage>,
    pub draft: String,
    pub last_error: Option<String>,
    // Ids of the last server snapshot, without optimistic additions.
    snapshot_ids: Vec<Uuid>,
    // Confirmed sends no snapshot has delivered yet.
    settled: Vec<MessageResponse>,
}

impl ViewState {
    pub fn replace_conversations(&mut self, snapshot: Vec<ConversationSummary>) {
        self.conversations = snapshot;
    }

    pub fn unread_total(&self) -> u64 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    /// Switch the selected thread. Messages are kept when re-selecting the
    /// same thread.
    pub fn select(&mut self, conversation_id: Uuid) {
        if self.selected != Some(conversation_id) {
            self.messages.clear();
            self.snapshot_ids.clear();
            self.settled.clear();
        }
        self.selected = Some(conversation_id);
    }

    /// Deselect the thread. Returns the thread that was open, if any.
    pub fn deselect(&mut self) -> Option<Uuid> {
        self.messages.clear();
        self.snapshot_ids.clear();
        self.settled.clear();
        self.selected.take()
    }

    pub fn clear_unread(&mut self, conversation_id: Uuid) {
        if let Some(summary) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            summary.unread_count = 0;
        }
    }

    /// Replace the open thread with a server snapshot.
    ///
    /// Confirmed sends missing from the snapshot are kept, since the fetch
    /// may have started before they were stored. Returns `false` and leaves
    /// the state untouched when `conversation_id` is no longer the selected
    /// thread.
    pub fn apply_thread_snapshot(
        &mut self,
        conversation_id: Uuid,
        snapshot: Vec<MessageResponse>,
    ) -> bool {
        if self.selected != Some(conversation_id) {
            return false;
        }

        let ids: Vec<Uuid> = snapshot.iter().map(|m| m.id).collect();
        if !is_prefix_consistent(&self.snapshot_ids, &ids) {
            warn!(
                conversation_id = %conversation_id,
                previous = self.snapshot_ids.len(),
                received = ids.len(),
                "thread snapshot reordered or dropped messages already shown"
            );
        }

        self.settled.retain(|m| !ids.contains(&m.id));
        self.snapshot_ids = ids;
        self.messages = snapshot;
        for message in &self.settled {
            insert_ordered(&mut self.messages, message.clone());
        }
        true
    }

    pub fn push_pending(&mut self, pending: PendingMessage) {
        self.pending.push(pending);
    }

    /// Replace a pending send with the message the server stored.
    pub fn settle_sent(&mut self, local_id: Uuid, message: MessageResponse) {
        self.pending.retain(|p| p.local_id != local_id);

        if self.selected == Some(message.conversation_id)
            && !self.snapshot_ids.contains(&message.id)
        {
            self.settled.push(message.clone());
            insert_ordered(&mut self.messages, message.clone());
        }

        if let Some(summary) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
        {
            let newer = summary
                .last_message_at
                .is_none_or(|current| current <= message.created_at);
            if newer {
                summary.last_message_at = Some(message.created_at);
                summary.latest_message = Some(LatestMessage {
                    message: message.message,
                    created_at: message.created_at,
                    is_sender: true,
                });
            }
        }
        sort_summaries(&mut self.conversations);
    }

    /// Drop a pending send that the server rejected and put its text back in
    /// the draft.
    pub fn fail_pending(&mut self, local_id: Uuid, error: String) -> Option<PendingMessage> {
        let index = self.pending.iter().position(|p| p.local_id == local_id)?;
        let pending = self.pending.remove(index);
        self.draft = pending.message.clone();
        self.last_error = Some(error);
        Some(pending)
    }
}

/// Insert by `(created_at, id)` unless the id is already present.
fn insert_ordered(messages: &mut Vec<MessageResponse>, message: MessageResponse) {
    if messages.iter().any(|m| m.id == message.id) {
        return;
    }
    let at = messages.partition_point(|m| (m.created_at, m.id) <= (message.created_at, message.id));
    messages.insert(at, message);
}

/// Whether `next` keeps every id of `previous` in place, with new ids only
/// after them.
pub fn is_prefix_consistent(previous: &[Uuid], next: &[Uuid]) -> bool {
    next.len() >= previous.len() && previous.iter().zip(next).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::conversations::ConversationStatus;
    use crate::models::users::{Roles, SenderRef, UserRef};
    use chrono::Duration;

    fn message(conversation_id: Uuid, text: &str, at: DateTime<Utc>) -> MessageResponse {
        let sender_id = Uuid::new_v4();
        MessageResponse {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            message: text.to_string(),
            message_type: MessageType::Text,
            attachment_url: None,
            is_read: false,
            read_at: None,
            is_sender: true,
            created_at: at,
            sender: SenderRef {
                id: sender_id,
                name: "Rita".to_string(),
                profile_image: None,
            },
        }
    }

    fn summary(id: Uuid, last_message_at: Option<DateTime<Utc>>) -> ConversationSummary {
        ConversationSummary {
            id,
            status: ConversationStatus::Active,
            last_message_at,
            unread_count: 2,
            participant: UserRef {
                id: Uuid::new_v4(),
                name: "Pat".to_string(),
                role: Roles::Patient,
                profile_image: None,
            },
            latest_message: None,
        }
    }

    #[test]
    fn test_prefix_consistency() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let c = Uuid::now_v7();

        assert!(is_prefix_consistent(&[], &[a]));
        assert!(is_prefix_consistent(&[a, b], &[a, b, c]));
        assert!(!is_prefix_consistent(&[a, b], &[b, a]));
        assert!(!is_prefix_consistent(&[a, b], &[a]));
    }

    #[test]
    fn test_stale_thread_snapshot_is_discarded() {
        let open = Uuid::new_v4();
        let stale = Uuid::new_v4();
        let mut state = ViewState::default();
        state.select(open);

        let applied =
            state.apply_thread_snapshot(stale, vec![message(stale, "old", Utc::now())]);

        assert!(!applied);
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_snapshot_replaces_thread_even_when_inconsistent() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let first = message(id, "first", now);
        let second = message(id, "second", now + Duration::seconds(1));
        let mut state = ViewState::default();
        state.select(id);

        assert!(state.apply_thread_snapshot(id, vec![first.clone(), second.clone()]));
        assert!(state.apply_thread_snapshot(id, vec![second.clone()]));

        assert_eq!(state.messages, vec![second]);
    }

    #[test]
    fn test_reselecting_same_thread_keeps_messages() {
        let id = Uuid::new_v4();
        let mut state = ViewState::default();
        state.select(id);
        state.apply_thread_snapshot(id, vec![message(id, "hi", Utc::now())]);

        state.select(id);
        assert_eq!(state.messages.len(), 1);

        state.select(Uuid::new_v4());
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_settle_sent_dedupes_and_updates_summary() {
        let quiet = Uuid::new_v4();
        let busy = Uuid::new_v4();
        let now = Utc::now();
        let mut state = ViewState::default();
        state.replace_conversations(vec![
            summary(quiet, Some(now - Duration::hours(1))),
            summary(busy, None),
        ]);
        state.select(busy);

        let pending = PendingMessage::text(busy, "On my way".to_string());
        let local_id = pending.local_id;
        state.push_pending(pending);

        let sent = message(busy, "On my way", now);
        // A poll delivered the message before the send response arrived.
        state.apply_thread_snapshot(busy, vec![sent.clone()]);
        state.settle_sent(local_id, sent.clone());

        assert!(state.pending.is_empty());
        assert_eq!(state.messages, vec![sent.clone()]);
        assert_eq!(state.conversations[0].id, busy);
        assert_eq!(state.conversations[0].last_message_at, Some(now));
        let latest = state.conversations[0].latest_message.as_ref().unwrap();
        assert_eq!(latest.message, "On my way");
        assert!(latest.is_sender);
    }

    #[test]
    fn test_settle_sent_keeps_thread_ordered() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let earlier = message(id, "earlier", now);
        let later = message(id, "later", now + Duration::seconds(5));
        let mut state = ViewState::default();
        state.select(id);
        state.apply_thread_snapshot(id, vec![later.clone()]);

        state.settle_sent(Uuid::new_v4(), earlier.clone());

        assert_eq!(state.messages, vec![earlier, later]);
    }

    #[test]
    fn test_confirmed_send_survives_older_snapshot() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let hello = message(id, "Hello", now);
        let reply = message(id, "On my way", now + Duration::seconds(1));
        let mut state = ViewState::default();
        state.select(id);
        state.apply_thread_snapshot(id, vec![hello.clone()]);

        state.settle_sent(Uuid::new_v4(), reply.clone());
        // Fetched before the reply was stored.
        state.apply_thread_snapshot(id, vec![hello.clone()]);
        assert_eq!(state.messages, vec![hello.clone(), reply.clone()]);

        // Once delivered, the server's copy is authoritative again.
        state.apply_thread_snapshot(id, vec![hello.clone(), reply.clone()]);
        state.apply_thread_snapshot(id, vec![hello.clone()]);
        assert_eq!(state.messages, vec![hello]);
    }

    #[test]
    fn test_fail_pending_restores_draft() {
        let id = Uuid::new_v4();
        let mut state = ViewState::default();
        let pending = PendingMessage::text(id, "Hello".to_string());
        let local_id = pending.local_id;
        state.push_pending(pending);

        let failed = state.fail_pending(local_id, "transport error".to_string());

        assert_eq!(failed.map(|p| p.message), Some("Hello".to_string()));
        assert!(state.pending.is_empty());
        assert_eq!(state.draft, "Hello");
        assert_eq!(state.last_error.as_deref(), Some("transport error"));
        assert!(state.fail_pending(local_id, "again".to_string()).is_none());
    }

    #[test]
    fn test_clear_unread_only_touches_one_conversation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut state = ViewState::default();
        state.replace_conversations(vec![summary(a, None), summary(b, None)]);

        state.clear_unread(a);

        assert_eq!(state.unread_total(), 2);
        assert_eq!(state.conversations[0].unread_count, 0);
    }
}
