//! Frappe/ERPNext backend integration
//!
//! This module provides:
//! - An HTTP client for the `sms_inbox` whitelisted API methods
//! - Wire payload types as the server sends them
//! - Normalization of wire rows into validated domain models

mod client;
mod normalize;

pub use client::FrappeClient;
pub use normalize::{
    normalize_conversation, normalize_conversations, normalize_message, normalize_messages,
    parse_timestamp,
};

/// Frappe API payload types
///
/// Fields are optional because the server omits nulls inconsistently;
/// required-ness is enforced during normalization.
pub mod api {
    use serde::Deserialize;

    /// One row of `get_conversations`
    #[derive(Debug, Deserialize)]
    pub struct ConversationRow {
        pub phone_number: Option<String>,
        pub contact_name: Option<String>,
        pub last_message: Option<String>,
        pub direction: Option<String>,
        pub last_message_time: Option<String>,
        pub linked_doctype: Option<String>,
        pub linked_name: Option<String>,
        pub unread_count: Option<i64>,
    }

    /// One row of `get_conversation_messages`
    #[derive(Debug, Deserialize)]
    pub struct MessageRow {
        pub name: Option<String>,
        pub direction: Option<String>,
        pub message: Option<String>,
        pub sent_at: Option<String>,
        pub linked_doctype: Option<String>,
        pub linked_name: Option<String>,
        pub sender_full_name: Option<String>,
    }

    /// Result of `send_sms`
    #[derive(Debug, Deserialize)]
    pub struct SendResult {
        #[serde(default)]
        pub success: bool,
        pub error: Option<String>,
        pub sid: Option<String>,
        pub log_name: Option<String>,
        pub recipient_number: Option<String>,
    }

    /// Result of the attach methods
    #[derive(Debug, Deserialize)]
    pub struct AttachResult {
        #[serde(default)]
        pub success: bool,
        pub message: Option<String>,
    }

    /// Result of `mark_conversation_read` / `mark_conversation_unread`
    #[derive(Debug, Deserialize)]
    pub struct MarkResult {
        #[serde(default)]
        pub success: bool,
        pub new_unread_count: Option<i64>,
    }

    /// Result of `get_sms_settings`
    #[derive(Debug, Deserialize)]
    pub struct SettingsResult {
        #[serde(default)]
        pub enabled: bool,
        pub phone_number: Option<String>,
    }

    /// Phone fields of a Contact, via `frappe.client.get_value`
    #[derive(Debug, Deserialize)]
    pub struct ContactPhones {
        pub mobile_no: Option<String>,
        pub phone: Option<String>,
    }
}
