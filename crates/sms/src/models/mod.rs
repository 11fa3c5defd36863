//! Domain models for SMS conversations

mod conversation;
mod link;
mod message;

pub use conversation::{Conversation, Direction, PhoneNumber};
pub use link::{LinkTarget, RecordLink, RecordType};
pub use message::{Message, MessageBuilder, MessageId, SelectedMessages};
