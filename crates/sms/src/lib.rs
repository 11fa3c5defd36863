//! SMS crate - Conversation inbox over a Frappe SMS log
//!
//! This crate provides platform-independent SMS inbox functionality including:
//! - Domain models (Conversation, Message, PhoneNumber, record links)
//! - Backend trait with a Frappe HTTP client and an in-memory implementation
//! - Settings loading and phone number normalization
//! - The conversation/message state manager with stale-response guarding
//! - View models for the conversation list and the open thread
//!
//! This crate has zero UI dependencies. Hosts run backend calls themselves
//! and feed results back in.

pub mod backend;
pub mod error;
pub mod inbox;
pub mod models;
pub mod phone;
pub mod settings;

pub use backend::{
    AttachReceipt, BackendCall, FrappeClient, InMemoryBackend, OutgoingSms, SendReceipt,
    SmsBackend, SmsSettings,
};
pub use error::{GENERIC_FAILURE, SmsError};
pub use inbox::{
    Badge, BadgeView, ConversationListView, Inbox, Notice, Outcome, PushEvent, Reaction, Reply,
    Request, RequestId, Response, ThreadItem, ThreadView, Ticket, execute,
};
pub use models::{
    Conversation, Direction, LinkTarget, Message, MessageBuilder, MessageId, PhoneNumber,
    RecordLink, RecordType, SelectedMessages,
};
pub use phone::{DEFAULT_COUNTRY_CODE, normalize_phone_number};
pub use settings::Settings;
