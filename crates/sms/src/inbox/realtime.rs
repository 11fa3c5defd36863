//! Push events and how the inbox reacts to them

use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::badge::Badge;
use super::notice::{NEW_SMS_TOAST_DURATION, Notice};
use crate::error::SmsError;
use crate::models::PhoneNumber;

pub const NEW_SMS_EVENT: &str = "new_sms";
pub const UNREAD_COUNT_EVENT: &str = "sms_unread_count_update";

/// Events a host must subscribe to
pub const SUBSCRIPTIONS: [&str; 2] = [NEW_SMS_EVENT, UNREAD_COUNT_EVENT];

#[derive(Debug, Deserialize)]
struct NewSmsPayload {
    phone: String,
    new_count: u32,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    preview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnreadCountPayload {
    new_count: u32,
}

/// A validated `new_sms` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSms {
    pub phone: PhoneNumber,
    /// Unread total after the message arrived
    pub new_count: u32,
    pub sender: String,
    pub preview: String,
}

/// A validated push event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    NewSms(NewSms),
    UnreadCountChanged { new_count: u32 },
}

impl PushEvent {
    /// Validate a raw event by name
    pub fn parse(event: &str, payload: &Value) -> Result<Self, SmsError> {
        match event {
            NEW_SMS_EVENT => {
                let raw: NewSmsPayload = serde_json::from_value(payload.clone())
                    .map_err(|e| SmsError::invalid_payload(format!("{event}: {e}")))?;
                let phone = raw.phone.trim();
                if phone.is_empty() {
                    return Err(SmsError::invalid_payload(format!("{event}: empty phone")));
                }
                Ok(PushEvent::NewSms(NewSms {
                    phone: PhoneNumber::new(phone),
                    new_count: raw.new_count,
                    sender: raw
                        .sender
                        .filter(|s| !s.trim().is_empty())
                        .unwrap_or_else(|| phone.to_string()),
                    preview: raw.preview.unwrap_or_default(),
                }))
            }
            UNREAD_COUNT_EVENT => {
                let raw: UnreadCountPayload = serde_json::from_value(payload.clone())
                    .map_err(|e| SmsError::invalid_payload(format!("{event}: {e}")))?;
                Ok(PushEvent::UnreadCountChanged {
                    new_count: raw.new_count,
                })
            }
            other => Err(SmsError::invalid_payload(format!(
                "unsubscribed event {other:?}"
            ))),
        }
    }
}

/// What the inbox should do about an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushAction {
    pub reload_list: bool,
    pub reload_thread: bool,
    pub notice: Option<Notice>,
}

/// Applies push events to the badge and decides which reloads they need
#[derive(Debug, Clone)]
pub struct Reconciler {
    badge: Arc<Badge>,
}

impl Reconciler {
    pub fn new(badge: Arc<Badge>) -> Self {
        Self { badge }
    }

    /// Handle `event` while `open` is the open conversation
    ///
    /// Counts are absolute, so repeated delivery of one event is harmless.
    pub fn apply(&self, event: &PushEvent, open: Option<&PhoneNumber>) -> PushAction {
        match event {
            PushEvent::NewSms(sms) => {
                info!("New SMS from {} ({} unread)", sms.phone, sms.new_count);
                self.badge.update_count(sms.new_count);
                PushAction {
                    reload_list: true,
                    reload_thread: open == Some(&sms.phone),
                    notice: Some(Notice::Toast {
                        message: format!("New SMS from {}\n{}", sms.sender, sms.preview),
                        duration: NEW_SMS_TOAST_DURATION,
                    }),
                }
            }
            PushEvent::UnreadCountChanged { new_count } => {
                debug!("Unread count pushed: {}", new_count);
                self.badge.update_count(*new_count);
                PushAction {
                    reload_list: false,
                    reload_thread: false,
                    notice: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_sms(phone: &str, count: u32) -> PushEvent {
        PushEvent::parse(
            NEW_SMS_EVENT,
            &json!({ "phone": phone, "new_count": count, "sender": "Jane", "preview": "hi" }),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(PushEvent::parse(NEW_SMS_EVENT, &json!({ "new_count": 1 })).is_err());
        assert!(PushEvent::parse(NEW_SMS_EVENT, &json!({ "phone": "+1", "new_count": -1 })).is_err());
        assert!(PushEvent::parse(UNREAD_COUNT_EVENT, &json!({ "new_count": "many" })).is_err());
        assert!(PushEvent::parse("doc_update", &json!({})).is_err());
    }

    #[test]
    fn test_sender_falls_back_to_phone() {
        let event = PushEvent::parse(NEW_SMS_EVENT, &json!({ "phone": "+1555", "new_count": 1 })).unwrap();
        match event {
            PushEvent::NewSms(sms) => assert_eq!(sms.sender, "+1555"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_new_sms_for_open_conversation() {
        let badge = Arc::new(Badge::new(0));
        let reconciler = Reconciler::new(Arc::clone(&badge));
        let open = PhoneNumber::new("+1555");

        let action = reconciler.apply(&new_sms("+1555", 4), Some(&open));
        assert!(action.reload_list);
        assert!(action.reload_thread);
        assert_eq!(badge.count(), 4);
        assert_eq!(
            action.notice,
            Some(Notice::Toast {
                message: "New SMS from Jane\nhi".into(),
                duration: NEW_SMS_TOAST_DURATION
            })
        );

        let other = reconciler.apply(&new_sms("+1666", 5), Some(&open));
        assert!(other.reload_list);
        assert!(!other.reload_thread);
    }

    #[test]
    fn test_duplicate_delivery_does_not_double_count() {
        let badge = Arc::new(Badge::new(0));
        let reconciler = Reconciler::new(Arc::clone(&badge));
        let event = new_sms("+1555", 3);
        reconciler.apply(&event, None);
        reconciler.apply(&event, None);
        assert_eq!(badge.count(), 3);
    }

    #[test]
    fn test_unread_count_only_touches_badge() {
        let badge = Arc::new(Badge::new(7));
        let reconciler = Reconciler::new(Arc::clone(&badge));
        let event = PushEvent::parse(UNREAD_COUNT_EVENT, &json!({ "new_count": 0 })).unwrap();
        let action = reconciler.apply(&event, Some(&PhoneNumber::new("+1555")));
        assert!(!action.reload_list);
        assert!(!action.reload_thread);
        assert!(action.notice.is_none());
        assert!(!badge.view().visible);
    }
}
