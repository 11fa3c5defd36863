//! Message model: a single SMS in a conversation thread

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Direction, PhoneNumber, RecordLink};

/// Unique identifier for a message (the backend's SMS Log name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single SMS within a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Counterpart number; equals the owning conversation's key
    pub phone: PhoneNumber,
    pub body: String,
    pub direction: Direction,
    pub sent_at: DateTime<Utc>,
    /// Full name of the user who sent an outbound message
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Per-message link, independent of the conversation-level link
    #[serde(default)]
    pub link: Option<RecordLink>,
}

impl Message {
    pub fn builder(id: MessageId, phone: PhoneNumber) -> MessageBuilder {
        MessageBuilder::new(id, phone)
    }
}

/// A non-empty set of message ids chosen for a bulk attach
///
/// The only way to build one is [`SelectedMessages::new`], which refuses an
/// empty list, so an attach with nothing selected cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedMessages(Vec<MessageId>);

#[allow(clippy::len_without_is_empty)]
impl SelectedMessages {
    /// Deduplicates while keeping first-seen order
    pub fn new(ids: impl IntoIterator<Item = MessageId>) -> Option<Self> {
        let mut unique: Vec<MessageId> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        (!unique.is_empty()).then_some(Self(unique))
    }

    pub fn ids(&self) -> &[MessageId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    phone: PhoneNumber,
    body: String,
    direction: Direction,
    sent_at: Option<DateTime<Utc>>,
    sender_name: Option<String>,
    link: Option<RecordLink>,
}

impl MessageBuilder {
    fn new(id: MessageId, phone: PhoneNumber) -> Self {
        Self {
            id,
            phone,
            body: String::new(),
            direction: Direction::Inbound,
            sent_at: None,
            sender_name: None,
            link: None,
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    pub fn sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn link(mut self, link: RecordLink) -> Self {
        self.link = Some(link);
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            phone: self.phone,
            body: self.body,
            direction: self.direction,
            sent_at: self.sent_at.unwrap_or_else(Utc::now),
            sender_name: self.sender_name,
            link: self.link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_defaults() {
        let msg = Message::builder(MessageId::new("SMS-0001"), PhoneNumber::new("+61400111222"))
            .body("hello")
            .build();
        assert_eq!(msg.direction, Direction::Inbound);
        assert!(msg.sender_name.is_none());
        assert!(msg.link.is_none());
    }

    #[test]
    fn test_selected_messages_rejects_empty() {
        assert!(SelectedMessages::new(Vec::new()).is_none());
        let picked = SelectedMessages::new(vec![
            MessageId::new("m2"),
            MessageId::new("m1"),
            MessageId::new("m2"),
        ])
        .unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.ids()[0].as_str(), "m2");
    }

    #[test]
    fn test_builder_sets_fields() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let msg = Message::builder(MessageId::new("SMS-0002"), PhoneNumber::new("+61400111222"))
            .body("On my way")
            .direction(Direction::Outbound)
            .sent_at(at)
            .sender_name("Sam Site")
            .link(RecordLink::new("Project", "PROJ-0001"))
            .build();
        assert_eq!(msg.sent_at, at);
        assert_eq!(msg.sender_name.as_deref(), Some("Sam Site"));
        assert_eq!(msg.link.unwrap().label(), "Project: PROJ-0001");
    }
}
