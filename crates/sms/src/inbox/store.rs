//! Conversation list and open thread
//!
//! The store never fetches anything. It records which requests it is waiting
//! on and decides whether an arriving result still applies.

use log::{debug, warn};

use super::request::{Outcome, RequestId};
use crate::error::SmsError;
use crate::models::{Conversation, Message, PhoneNumber};

/// Result of applying a thread response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadUpdate {
    /// Thread replaced; `mark_read` when the open conversation had unread messages
    Applied { mark_read: bool },
    Failed,
    Discarded,
}

impl ThreadUpdate {
    pub fn outcome(&self) -> Outcome {
        match self {
            ThreadUpdate::Applied { .. } => Outcome::Applied,
            ThreadUpdate::Failed => Outcome::Failed,
            ThreadUpdate::Discarded => Outcome::Discarded,
        }
    }
}

/// Holds the conversation list and the currently loaded thread
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    /// Lowercased search text
    filter: String,
    /// Snapshot of the open conversation
    current: Option<Conversation>,
    thread: Vec<Message>,
    loading: bool,
    /// Latest thread request; only its response may apply
    thread_request: Option<RequestId>,
    /// Most recent list response applied
    list_applied: Option<RequestId>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current.as_ref()
    }

    pub fn current_phone(&self) -> Option<&PhoneNumber> {
        self.current.as_ref().map(|c| &c.phone)
    }

    pub fn is_open(&self, phone: &PhoneNumber) -> bool {
        self.current_phone() == Some(phone)
    }

    /// Messages of the open conversation, oldest first
    pub fn thread(&self) -> &[Message] {
        &self.thread
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn find(&self, phone: &PhoneNumber) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.phone == phone)
    }

    /// Sum of unread counts over the known list
    pub fn unread_total(&self) -> u32 {
        self.conversations
            .iter()
            .fold(0u32, |sum, c| sum.saturating_add(c.unread_count))
    }

    pub fn search_filter(&self) -> &str {
        &self.filter
    }

    /// Store a case-insensitive filter; the list itself is untouched
    ///
    /// Whitespace is significant: `"jane "` does not match `"Janet"`.
    pub fn set_search_filter(&mut self, text: &str) {
        self.filter = text.to_lowercase();
    }

    /// Conversations matching the current filter, in backend order
    pub fn filtered(&self) -> Vec<&Conversation> {
        self.conversations
            .iter()
            .filter(|c| c.matches_filter(&self.filter))
            .collect()
    }

    /// Apply a conversation list response
    ///
    /// A response older than the last applied list is dropped. Failures
    /// leave an empty list behind.
    pub fn apply_list(
        &mut self,
        id: RequestId,
        result: Result<Vec<Conversation>, SmsError>,
    ) -> Outcome {
        if self.list_applied.is_some_and(|applied| id < applied) {
            debug!("Discarding stale conversation list {}", id);
            return Outcome::Discarded;
        }
        self.list_applied = Some(id);

        match result {
            Ok(conversations) => {
                debug!("Loaded {} conversations", conversations.len());
                self.conversations = conversations;
                self.refresh_current();
                Outcome::Applied
            }
            Err(e) => {
                warn!("Failed to load conversations: {}", e);
                self.conversations.clear();
                Outcome::Failed
            }
        }
    }

    /// Keep the open conversation snapshot in step with the newest row
    fn refresh_current(&mut self) {
        if let Some(current) = self.current.as_mut()
            && let Some(row) = self.conversations.iter().find(|c| c.phone == current.phone)
        {
            *current = row.clone();
        }
    }

    /// Make `conversation` current before its thread is fetched
    ///
    /// The thread is kept while reloading the same conversation and cleared
    /// when switching to a different one.
    pub fn begin_thread(&mut self, conversation: Conversation, id: RequestId) {
        if !self.is_open(&conversation.phone) {
            self.thread.clear();
        }
        debug!("Opening {} as {}", conversation.phone, id);
        self.current = Some(conversation);
        self.thread_request = Some(id);
        self.loading = true;
    }

    /// Apply a thread response for `phone`
    pub fn apply_thread(
        &mut self,
        id: RequestId,
        phone: &PhoneNumber,
        result: Result<Vec<Message>, SmsError>,
    ) -> ThreadUpdate {
        if self.thread_request != Some(id) || !self.is_open(phone) {
            debug!("Discarding stale thread {} for {}", id, phone);
            return ThreadUpdate::Discarded;
        }
        self.thread_request = None;
        self.loading = false;

        match result {
            Ok(messages) => {
                debug!("Loaded {} messages for {}", messages.len(), phone);
                self.thread = messages;
                let mark_read = self.current.as_ref().is_some_and(|c| c.unread_count > 0);
                ThreadUpdate::Applied { mark_read }
            }
            Err(e) => {
                warn!("Failed to load messages for {}: {}", phone, e);
                ThreadUpdate::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, MessageId};
    use chrono::Utc;

    fn conv(phone: &str, unread: u32) -> Conversation {
        Conversation::new(PhoneNumber::new(phone), "hi", Utc::now(), Direction::Inbound)
            .with_unread(unread)
    }

    fn msg(id: &str, phone: &str) -> Message {
        Message::builder(MessageId::new(id), PhoneNumber::new(phone)).build()
    }

    #[test]
    fn test_older_list_discarded() {
        let mut store = ConversationStore::new();
        assert_eq!(
            store.apply_list(RequestId(2), Ok(vec![conv("+1", 0)])),
            Outcome::Applied
        );
        assert_eq!(
            store.apply_list(RequestId(1), Ok(vec![conv("+2", 0), conv("+3", 0)])),
            Outcome::Discarded
        );
        assert_eq!(store.conversations().len(), 1);
    }

    #[test]
    fn test_list_failure_renders_empty() {
        let mut store = ConversationStore::new();
        store.apply_list(RequestId(1), Ok(vec![conv("+1", 2)]));
        let outcome = store.apply_list(RequestId(2), Err(SmsError::transport("down")));
        assert_eq!(outcome, Outcome::Failed);
        assert!(store.conversations().is_empty());
    }

    #[test]
    fn test_unread_total() {
        let mut store = ConversationStore::new();
        store.apply_list(RequestId(1), Ok(vec![conv("+1", 2), conv("+2", 3)]));
        assert_eq!(store.unread_total(), 5);
    }

    #[test]
    fn test_thread_guard_requires_latest_request_and_phone() {
        let mut store = ConversationStore::new();
        let a = PhoneNumber::new("+1");
        let b = PhoneNumber::new("+2");
        store.begin_thread(conv("+1", 0), RequestId(1));
        store.begin_thread(conv("+2", 0), RequestId(2));

        let stale = store.apply_thread(RequestId(1), &a, Ok(vec![msg("a1", "+1")]));
        assert_eq!(stale, ThreadUpdate::Discarded);
        assert!(store.is_loading());

        let fresh = store.apply_thread(RequestId(2), &b, Ok(vec![msg("b1", "+2")]));
        assert_eq!(fresh, ThreadUpdate::Applied { mark_read: false });
        assert_eq!(store.thread()[0].id.as_str(), "b1");
        assert!(!store.is_loading());
    }

    #[test]
    fn test_mark_read_only_with_unread() {
        let mut store = ConversationStore::new();
        let phone = PhoneNumber::new("+1");
        store.begin_thread(conv("+1", 3), RequestId(1));
        assert_eq!(
            store.apply_thread(RequestId(1), &phone, Ok(Vec::new())),
            ThreadUpdate::Applied { mark_read: true }
        );
        // A duplicate delivery of the same response is not applied twice
        assert_eq!(
            store.apply_thread(RequestId(1), &phone, Ok(Vec::new())),
            ThreadUpdate::Discarded
        );
    }

    #[test]
    fn test_reload_same_conversation_keeps_thread_until_reply() {
        let mut store = ConversationStore::new();
        let phone = PhoneNumber::new("+1");
        store.begin_thread(conv("+1", 0), RequestId(1));
        store.apply_thread(RequestId(1), &phone, Ok(vec![msg("m1", "+1")]));

        store.begin_thread(conv("+1", 0), RequestId(2));
        assert_eq!(store.thread().len(), 1);

        store.begin_thread(conv("+2", 0), RequestId(3));
        assert!(store.thread().is_empty());
    }

    #[test]
    fn test_list_refreshes_current_snapshot() {
        let mut store = ConversationStore::new();
        store.begin_thread(conv("+1", 0), RequestId(1));
        store.apply_list(RequestId(2), Ok(vec![conv("+1", 4)]));
        assert_eq!(store.current().unwrap().unread_count, 4);
    }

    #[test]
    fn test_filter_is_non_destructive() {
        let mut store = ConversationStore::new();
        let rows = vec![
            conv("+1555", 0).with_display_name("Jane Builder"),
            conv("+1666", 0).with_display_name("Sam Site"),
        ];
        store.apply_list(RequestId(1), Ok(rows));
        store.set_search_filter("JANE");
        assert_eq!(store.filtered().len(), 1);
        assert_eq!(store.conversations().len(), 2);
        store.set_search_filter("");
        assert_eq!(store.filtered().len(), 2);
    }

    #[test]
    fn test_filter_keeps_surrounding_whitespace() {
        let mut store = ConversationStore::new();
        let rows = vec![
            conv("+1555", 0).with_display_name("Jane Builder"),
            conv("+1666", 0).with_display_name("Janet Plumbing"),
        ];
        store.apply_list(RequestId(1), Ok(rows));

        store.set_search_filter("Jane ");
        assert_eq!(store.search_filter(), "jane ");
        let names: Vec<&str> = store.filtered().iter().map(|c| c.title()).collect();
        assert_eq!(names, ["Jane Builder"]);

        store.set_search_filter("jane");
        assert_eq!(store.filtered().len(), 2);
    }
}
