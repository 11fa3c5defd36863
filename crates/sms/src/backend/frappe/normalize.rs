//! Normalize Frappe wire rows into domain models
//!
//! Every row is validated on its own. A malformed row is logged and dropped
//! so one bad record never poisons a whole listing.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::warn;
use serde_json::Value;

use super::api::{ConversationRow, MessageRow};
use crate::error::SmsError;
use crate::models::{Conversation, Direction, Message, MessageId, PhoneNumber, RecordLink};

/// Naive formats Frappe uses for Datetime fields
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Parse a backend timestamp
///
/// RFC 3339 strings carry their own offset; naive strings are interpreted in
/// `server_offset`.
pub fn parse_timestamp(raw: &str, server_offset: &FixedOffset) -> Result<DateTime<Utc>, SmsError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| server_offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| SmsError::invalid_payload(format!("unparseable timestamp {raw:?}")))
}

fn required(field: Option<String>, name: &str) -> Result<String, SmsError> {
    field
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SmsError::invalid_payload(format!("missing {name}")))
}

/// Validate one `get_conversations` row
pub fn normalize_conversation(
    row: Value,
    server_offset: &FixedOffset,
) -> Result<Conversation, SmsError> {
    let row: ConversationRow = serde_json::from_value(row)
        .map_err(|e| SmsError::invalid_payload(format!("conversation row: {e}")))?;

    let phone = PhoneNumber::new(required(row.phone_number, "phone_number")?);
    let direction: Direction = required(row.direction, "direction")?.parse()?;
    let last_message_at = parse_timestamp(
        &required(row.last_message_time, "last_message_time")?,
        server_offset,
    )?;
    let unread_count = match row.unread_count {
        None => 0,
        Some(n) => u32::try_from(n)
            .map_err(|_| SmsError::invalid_payload(format!("unread_count out of range: {n}")))?,
    };

    let mut conversation = Conversation::new(
        phone,
        row.last_message.unwrap_or_default(),
        last_message_at,
        direction,
    )
    .with_unread(unread_count);
    conversation.display_name = row.contact_name.filter(|n| !n.trim().is_empty());
    conversation.link = RecordLink::from_parts(row.linked_doctype, row.linked_name);
    Ok(conversation)
}

/// Validate a `get_conversation_messages` row belonging to `phone`
pub fn normalize_message(
    row: Value,
    phone: &PhoneNumber,
    server_offset: &FixedOffset,
) -> Result<Message, SmsError> {
    let row: MessageRow = serde_json::from_value(row)
        .map_err(|e| SmsError::invalid_payload(format!("message row: {e}")))?;

    let id = MessageId::new(required(row.name, "name")?);
    let direction: Direction = required(row.direction, "direction")?.parse()?;
    let sent_at = parse_timestamp(&required(row.sent_at, "sent_at")?, server_offset)?;

    let mut builder = Message::builder(id, phone.clone())
        .body(row.message.unwrap_or_default())
        .direction(direction)
        .sent_at(sent_at);
    // Sender names only mean something for messages we sent
    if direction == Direction::Outbound
        && let Some(name) = row.sender_full_name.filter(|n| !n.trim().is_empty())
    {
        builder = builder.sender_name(name);
    }
    if let Some(link) = RecordLink::from_parts(row.linked_doctype, row.linked_name) {
        builder = builder.link(link);
    }
    Ok(builder.build())
}

/// Validate a conversation listing, dropping malformed rows
pub fn normalize_conversations(rows: Vec<Value>, server_offset: &FixedOffset) -> Vec<Conversation> {
    rows.into_iter()
        .filter_map(|row| match normalize_conversation(row, server_offset) {
            Ok(conversation) => Some(conversation),
            Err(e) => {
                warn!("Skipping malformed conversation row: {}", e);
                None
            }
        })
        .collect()
}

/// Validate a thread listing, dropping malformed rows
pub fn normalize_messages(
    rows: Vec<Value>,
    phone: &PhoneNumber,
    server_offset: &FixedOffset,
) -> Vec<Message> {
    rows.into_iter()
        .filter_map(|row| match normalize_message(row, phone, server_offset) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Skipping malformed message row for {}: {}", phone, e);
                None
            }
        })
        .collect()
}
