//! Conversation model: one row per counterpart phone number

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::RecordLink;
use crate::error::SmsError;

/// Counterpart phone number, the durable identity of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhoneNumber(pub String);

impl PhoneNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PhoneNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PhoneNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which way a message travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "Inbound",
            Direction::Outbound => "Outbound",
        }
    }

    /// Arrow shown before a list preview
    pub fn arrow(&self) -> char {
        match self {
            Direction::Inbound => '←',
            Direction::Outbound => '→',
        }
    }
}

impl FromStr for Direction {
    type Err = SmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Inbound" => Ok(Direction::Inbound),
            "Outbound" => Ok(Direction::Outbound),
            other => Err(SmsError::invalid_payload(format!(
                "unknown direction {other:?}"
            ))),
        }
    }
}

/// Summary row for a conversation, as returned by the listing endpoint
///
/// Rows are replaced wholesale on every list refresh; nothing in the client
/// patches them incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Counterpart phone number (unique key)
    pub phone: PhoneNumber,
    /// Contact name if the backend resolved one
    #[serde(default)]
    pub display_name: Option<String>,
    /// Body of the latest message
    pub last_message: String,
    /// When the latest message was sent or received
    pub last_message_at: DateTime<Utc>,
    /// Direction of the latest message
    pub last_direction: Direction,
    /// Unread inbound messages in this conversation
    #[serde(default)]
    pub unread_count: u32,
    /// Business record the conversation is linked to
    #[serde(default)]
    pub link: Option<RecordLink>,
}

impl Conversation {
    pub fn new(
        phone: PhoneNumber,
        last_message: impl Into<String>,
        last_message_at: DateTime<Utc>,
        last_direction: Direction,
    ) -> Self {
        Self {
            phone,
            display_name: None,
            last_message: last_message.into(),
            last_message_at,
            last_direction,
            unread_count: 0,
            link: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_unread(mut self, unread_count: u32) -> Self {
        self.unread_count = unread_count;
        self
    }

    pub fn with_link(mut self, link: RecordLink) -> Self {
        self.link = Some(link);
        self
    }

    /// Contact name, falling back to the phone number
    pub fn title(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(self.phone.as_str())
    }

    /// Case-insensitive substring match over name, number, and preview
    ///
    /// `needle` must already be lowercase. The fields are joined with a single
    /// space before matching, and an empty needle matches everything.
    pub fn matches_filter(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let haystack = [
            self.display_name.as_deref(),
            Some(self.phone.as_str()),
            Some(self.last_message.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
        haystack.contains(needle)
    }
}
