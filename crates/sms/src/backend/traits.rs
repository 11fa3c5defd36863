//! Backend trait definitions

use serde::{Deserialize, Serialize};

use crate::error::SmsError;
use crate::models::{Conversation, LinkTarget, Message, PhoneNumber, RecordLink, SelectedMessages};

/// An SMS to hand to the backend for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingSms {
    pub recipient: PhoneNumber,
    pub body: String,
    /// Record the outbound log entry should be linked to
    #[serde(default)]
    pub link: Option<RecordLink>,
    #[serde(default)]
    pub contact_name: Option<String>,
}

impl OutgoingSms {
    pub fn new(recipient: PhoneNumber, body: impl Into<String>) -> Self {
        Self {
            recipient,
            body: body.into(),
            link: None,
            contact_name: None,
        }
    }
}

/// Acknowledgement of a successful send
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Provider message SID
    pub sid: Option<String>,
    /// Name of the log record created for the message
    pub log_name: Option<String>,
    /// Number the backend actually sent to, after its own normalization
    pub recipient: Option<PhoneNumber>,
}

/// Acknowledgement of a successful attach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachReceipt {
    /// Human-readable summary, e.g. "Attached 3 messages to Lead: L-1"
    pub message: String,
}

/// Whether sending is configured on the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsSettings {
    pub enabled: bool,
    pub phone_number: Option<String>,
}

/// Operations the inbox consumes from the record-keeping backend
///
/// Calls are blocking; hosts run them off their event loop. Business
/// failures (`success: false`) come back as [`SmsError::Rejected`].
pub trait SmsBackend: Send + Sync {
    /// Conversation summaries, newest first
    fn get_conversations(&self) -> Result<Vec<Conversation>, SmsError>;

    /// Every message exchanged with `phone`, oldest first
    fn get_conversation_messages(&self, phone: &PhoneNumber) -> Result<Vec<Message>, SmsError>;

    /// Mark all inbound messages from `phone` read; returns the new unread total
    fn mark_conversation_read(&self, phone: &PhoneNumber) -> Result<u32, SmsError>;

    /// Flag the latest inbound message from `phone` unread; returns the new unread total
    fn mark_conversation_unread(&self, phone: &PhoneNumber) -> Result<u32, SmsError>;

    fn send_sms(&self, sms: &OutgoingSms) -> Result<SendReceipt, SmsError>;

    /// Link every message exchanged with `phone` to `target`
    fn attach_conversation_to_record(
        &self,
        phone: &PhoneNumber,
        target: &LinkTarget,
    ) -> Result<AttachReceipt, SmsError>;

    /// Link exactly the given messages to `target`
    fn attach_sms_messages_to_record(
        &self,
        messages: &SelectedMessages,
        target: &LinkTarget,
    ) -> Result<AttachReceipt, SmsError>;

    /// Phone number on file for a contact (mobile preferred)
    fn contact_phone(&self, contact: &str) -> Result<Option<String>, SmsError>;

    /// Unread inbound messages across all conversations
    fn unread_count(&self) -> Result<u32, SmsError>;

    fn sms_settings(&self) -> Result<SmsSettings, SmsError>;
}
