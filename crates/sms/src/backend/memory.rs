//! In-memory backend implementation
//!
//! Behaves like the Frappe app against a process-local message log. Used by
//! the test suites and for running the host without a server.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{AttachReceipt, OutgoingSms, SendReceipt, SmsBackend, SmsSettings};
use crate::error::SmsError;
use crate::models::{
    Conversation, Direction, LinkTarget, Message, MessageId, PhoneNumber, RecordLink,
    SelectedMessages,
};
use crate::phone::{DEFAULT_COUNTRY_CODE, normalize_phone_number};

/// Longest preview carried by a `new_sms` push before truncation
const PUSH_PREVIEW_CHARS: usize = 50;

/// A backend call, as recorded in the call log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    GetConversations,
    GetConversationMessages(PhoneNumber),
    MarkRead(PhoneNumber),
    MarkUnread(PhoneNumber),
    SendSms(OutgoingSms),
    AttachConversation(PhoneNumber, LinkTarget),
    AttachMessages(Vec<MessageId>, LinkTarget),
    ContactPhone(String),
    UnreadCount,
    SmsSettings,
}

/// One stored SMS log entry
struct StoredSms {
    message: Message,
    read: bool,
    contact_name: Option<String>,
}

#[derive(Default)]
struct ContactPhones {
    mobile_no: Option<String>,
    phone: Option<String>,
}

#[derive(Default)]
struct State {
    log: Vec<StoredSms>,
    contacts: HashMap<String, ContactPhones>,
    calls: Vec<BackendCall>,
    fail_next: Option<SmsError>,
    next_id: u64,
    sending_number: Option<String>,
}

/// In-memory implementation of SmsBackend
pub struct InMemoryBackend {
    state: RwLock<State>,
    default_country_code: String,
}

impl InMemoryBackend {
    /// Create an empty backend using the default country code
    pub fn new() -> Self {
        Self::with_country_code(DEFAULT_COUNTRY_CODE)
    }

    pub fn with_country_code(code: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            default_country_code: code.into(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and consume any injected failure
    fn begin(&self, call: BackendCall) -> Result<RwLockWriteGuard<'_, State>, SmsError> {
        let mut state = self.write();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    /// Store a message as-is; inbound messages start unread unless `read`
    pub fn add_message(&self, message: Message, read: bool) {
        let read = read || message.direction == Direction::Outbound;
        self.write().log.push(StoredSms {
            message,
            read,
            contact_name: None,
        });
    }

    /// Set the contact name reported for every message with `phone`
    pub fn set_contact_name(&self, phone: &PhoneNumber, name: impl Into<String>) {
        let name = name.into();
        for sms in self.write().log.iter_mut() {
            if &sms.message.phone == phone {
                sms.contact_name = Some(name.clone());
            }
        }
    }

    /// Register a Contact with its phone fields
    pub fn add_contact(&self, name: impl Into<String>, mobile_no: Option<&str>, phone: Option<&str>) {
        self.write().contacts.insert(
            name.into(),
            ContactPhones {
                mobile_no: mobile_no.map(str::to_string),
                phone: phone.map(str::to_string),
            },
        );
    }

    /// Configure the sending number; sending is disabled until this is set
    pub fn enable_sending(&self, from_number: impl Into<String>) {
        self.write().sending_number = Some(from_number.into());
    }

    /// Make the next backend call fail with `err`
    pub fn fail_next(&self, err: SmsError) {
        self.write().fail_next = Some(err);
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<BackendCall> {
        self.read().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.write().calls.clear();
    }

    /// Current stored copy of a message
    pub fn message(&self, id: &MessageId) -> Option<Message> {
        self.read()
            .log
            .iter()
            .find(|sms| &sms.message.id == id)
            .map(|sms| sms.message.clone())
    }

    /// Simulate an inbound SMS arriving from `from`
    ///
    /// Returns the `new_sms` push payload the server would publish.
    pub fn receive(&self, from: &str, body: &str, at: DateTime<Utc>) -> Value {
        let phone = PhoneNumber::new(normalize_phone_number(from, &self.default_country_code));
        let mut state = self.write();

        let contact_name = state
            .log
            .iter()
            .rev()
            .filter(|sms| sms.message.phone == phone)
            .find_map(|sms| sms.contact_name.clone());
        let link = state
            .log
            .iter()
            .rev()
            .filter(|sms| {
                sms.message.phone == phone && sms.message.direction == Direction::Outbound
            })
            .find_map(|sms| sms.message.link.clone());

        let id = next_message_id(&mut state);
        let mut builder = Message::builder(id, phone.clone())
            .body(body)
            .direction(Direction::Inbound)
            .sent_at(at);
        if let Some(link) = link {
            builder = builder.link(link);
        }
        state.log.push(StoredSms {
            message: builder.build(),
            read: false,
            contact_name: contact_name.clone(),
        });

        json!({
            "sender": contact_name.unwrap_or_else(|| phone.to_string()),
            "preview": push_preview(body),
            "phone": phone.as_str(),
            "new_count": unread_total(&state),
        })
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn next_message_id(state: &mut State) -> MessageId {
    state.next_id += 1;
    MessageId::new(format!("SMS-MEM-{:05}", state.next_id))
}

fn unread_total(state: &State) -> u32 {
    let count = state
        .log
        .iter()
        .filter(|sms| sms.message.direction == Direction::Inbound && !sms.read)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn push_preview(body: &str) -> String {
    if body.chars().count() > PUSH_PREVIEW_CHARS {
        let head: String = body.chars().take(PUSH_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

impl SmsBackend for InMemoryBackend {
    fn get_conversations(&self) -> Result<Vec<Conversation>, SmsError> {
        let state = self.begin(BackendCall::GetConversations)?;

        let mut latest: HashMap<&PhoneNumber, &StoredSms> = HashMap::new();
        let mut unread: HashMap<&PhoneNumber, u32> = HashMap::new();
        for sms in &state.log {
            let phone = &sms.message.phone;
            if sms.message.direction == Direction::Inbound && !sms.read {
                *unread.entry(phone).or_default() += 1;
            }
            let newer = latest
                .get(phone)
                .is_none_or(|current| sms.message.sent_at >= current.message.sent_at);
            if newer {
                latest.insert(phone, sms);
            }
        }

        let mut conversations: Vec<Conversation> = latest
            .into_iter()
            .map(|(phone, sms)| {
                let mut conversation = Conversation::new(
                    phone.clone(),
                    sms.message.body.clone(),
                    sms.message.sent_at,
                    sms.message.direction,
                )
                .with_unread(unread.get(phone).copied().unwrap_or(0));
                conversation.display_name = sms.contact_name.clone();
                conversation.link = sms.message.link.clone();
                conversation
            })
            .collect();
        conversations.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then_with(|| a.phone.cmp(&b.phone))
        });
        Ok(conversations)
    }

    fn get_conversation_messages(&self, phone: &PhoneNumber) -> Result<Vec<Message>, SmsError> {
        let state = self.begin(BackendCall::GetConversationMessages(phone.clone()))?;
        let mut messages: Vec<Message> = state
            .log
            .iter()
            .filter(|sms| &sms.message.phone == phone)
            .map(|sms| sms.message.clone())
            .collect();
        // Stable, so same-second messages keep insertion order
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }

    fn mark_conversation_read(&self, phone: &PhoneNumber) -> Result<u32, SmsError> {
        let mut state = self.begin(BackendCall::MarkRead(phone.clone()))?;
        for sms in state.log.iter_mut() {
            if &sms.message.phone == phone && sms.message.direction == Direction::Inbound {
                sms.read = true;
            }
        }
        Ok(unread_total(&state))
    }

    fn mark_conversation_unread(&self, phone: &PhoneNumber) -> Result<u32, SmsError> {
        let mut state = self.begin(BackendCall::MarkUnread(phone.clone()))?;
        let latest_inbound = state
            .log
            .iter_mut()
            .filter(|sms| &sms.message.phone == phone && sms.message.direction == Direction::Inbound)
            .max_by_key(|sms| sms.message.sent_at);
        match latest_inbound {
            Some(sms) => sms.read = false,
            None => {
                return Err(SmsError::rejected(Some(
                    "No inbound messages to mark unread".to_string(),
                )));
            }
        }
        Ok(unread_total(&state))
    }

    fn send_sms(&self, sms: &OutgoingSms) -> Result<SendReceipt, SmsError> {
        let mut state = self.begin(BackendCall::SendSms(sms.clone()))?;
        if state.sending_number.is_none() {
            return Err(SmsError::rejected(Some(
                "SMS is not enabled. Configure SMS Settings.".to_string(),
            )));
        }
        let recipient = PhoneNumber::new(normalize_phone_number(
            sms.recipient.as_str(),
            &self.default_country_code,
        ));
        if recipient.as_str().is_empty() {
            return Err(SmsError::rejected(Some("Recipient number is required".to_string())));
        }

        let id = next_message_id(&mut state);
        let mut builder = Message::builder(id.clone(), recipient.clone())
            .body(sms.body.clone())
            .direction(Direction::Outbound)
            .sent_at(Utc::now())
            .sender_name("Administrator");
        if let Some(link) = sms.link.clone() {
            builder = builder.link(link);
        }
        state.log.push(StoredSms {
            message: builder.build(),
            read: true,
            contact_name: sms.contact_name.clone(),
        });

        Ok(SendReceipt {
            sid: Some(format!("SM{:032x}", state.next_id)),
            log_name: Some(id.to_string()),
            recipient: Some(recipient),
        })
    }

    fn attach_conversation_to_record(
        &self,
        phone: &PhoneNumber,
        target: &LinkTarget,
    ) -> Result<AttachReceipt, SmsError> {
        let mut state = self.begin(BackendCall::AttachConversation(phone.clone(), target.clone()))?;
        let link = RecordLink::from(target.clone());
        let mut attached = 0;
        for sms in state.log.iter_mut() {
            if &sms.message.phone == phone {
                sms.message.link = Some(link.clone());
                attached += 1;
            }
        }
        if attached == 0 {
            return Err(SmsError::rejected(Some("No SMS messages found".to_string())));
        }
        Ok(AttachReceipt {
            message: format!("Attached {attached} messages"),
        })
    }

    fn attach_sms_messages_to_record(
        &self,
        messages: &SelectedMessages,
        target: &LinkTarget,
    ) -> Result<AttachReceipt, SmsError> {
        let mut state = self.begin(BackendCall::AttachMessages(
            messages.ids().to_vec(),
            target.clone(),
        ))?;
        let link = RecordLink::from(target.clone());
        for sms in state.log.iter_mut() {
            if messages.ids().contains(&sms.message.id) {
                sms.message.link = Some(link.clone());
            }
        }
        Ok(AttachReceipt {
            message: format!("Attached {} messages", messages.len()),
        })
    }

    fn contact_phone(&self, contact: &str) -> Result<Option<String>, SmsError> {
        let state = self.begin(BackendCall::ContactPhone(contact.to_string()))?;
        Ok(state.contacts.get(contact).and_then(|c| {
            [c.mobile_no.as_ref(), c.phone.as_ref()]
                .into_iter()
                .flatten()
                .find(|p| !p.trim().is_empty())
                .cloned()
        }))
    }

    fn unread_count(&self) -> Result<u32, SmsError> {
        let state = self.begin(BackendCall::UnreadCount)?;
        Ok(unread_total(&state))
    }

    fn sms_settings(&self) -> Result<SmsSettings, SmsError> {
        let state = self.begin(BackendCall::SmsSettings)?;
        Ok(SmsSettings {
            enabled: state.sending_number.is_some(),
            phone_number: state.sending_number.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordType;
    use chrono::{Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).unwrap()
    }

    fn inbound(id: &str, phone: &str, minute: u32) -> Message {
        Message::builder(MessageId::new(id), PhoneNumber::new(phone))
            .body(format!("body of {id}"))
            .direction(Direction::Inbound)
            .sent_at(at(minute))
            .build()
    }

    #[test]
    fn test_conversations_grouped_and_ordered() {
        let backend = InMemoryBackend::new();
        backend.add_message(inbound("m1", "+1555", 1), false);
        backend.add_message(inbound("m2", "+1555", 5), false);
        backend.add_message(inbound("m3", "+1666", 3), true);

        let convs = backend.get_conversations().unwrap();
        assert_eq!(convs.len(), 2);
        assert_eq!(convs[0].phone.as_str(), "+1555");
        assert_eq!(convs[0].last_message, "body of m2");
        assert_eq!(convs[0].unread_count, 2);
        assert_eq!(convs[1].unread_count, 0);
        assert_eq!(backend.unread_count().unwrap(), 2);
    }

    #[test]
    fn test_messages_ascending() {
        let backend = InMemoryBackend::new();
        backend.add_message(inbound("late", "+1555", 9), false);
        backend.add_message(inbound("early", "+1555", 2), false);
        let msgs = backend
            .get_conversation_messages(&PhoneNumber::new("+1555"))
            .unwrap();
        let ids: Vec<&str> = msgs.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn test_mark_read_then_unread() {
        let backend = InMemoryBackend::new();
        let phone = PhoneNumber::new("+1555");
        backend.add_message(inbound("m1", "+1555", 1), false);
        backend.add_message(inbound("m2", "+1555", 2), false);

        assert_eq!(backend.mark_conversation_read(&phone).unwrap(), 0);
        assert_eq!(backend.mark_conversation_unread(&phone).unwrap(), 1);
        assert!(
            backend
                .mark_conversation_unread(&PhoneNumber::new("+1999"))
                .is_err()
        );
    }

    #[test]
    fn test_send_normalizes_and_records() {
        let backend = InMemoryBackend::new();
        backend.enable_sending("+61700000000");
        let mut sms = OutgoingSms::new(PhoneNumber::new("0400 111 222"), "Quote attached");
        sms.link = Some(RecordLink::new("Lead", "LEAD-1"));

        let receipt = backend.send_sms(&sms).unwrap();
        assert_eq!(receipt.recipient.unwrap().as_str(), "+61400111222");

        let msgs = backend
            .get_conversation_messages(&PhoneNumber::new("+61400111222"))
            .unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].direction, Direction::Outbound);
        assert_eq!(msgs[0].link.as_ref().unwrap().label(), "Lead: LEAD-1");
    }

    #[test]
    fn test_send_requires_settings() {
        let backend = InMemoryBackend::new();
        let err = backend
            .send_sms(&OutgoingSms::new(PhoneNumber::new("+1555"), "hi"))
            .unwrap_err();
        assert_eq!(err.user_message(), "SMS is not enabled. Configure SMS Settings.");
    }

    #[test]
    fn test_attach_conversation() {
        let backend = InMemoryBackend::new();
        backend.add_message(inbound("m1", "+1555", 1), false);
        backend.add_message(inbound("m2", "+1555", 2), false);
        let target = LinkTarget::new(RecordType::Customer, "CUST-001").unwrap();

        let receipt = backend
            .attach_conversation_to_record(&PhoneNumber::new("+1555"), &target)
            .unwrap();
        assert_eq!(receipt.message, "Attached 2 messages");
        let m2 = backend.message(&MessageId::new("m2")).unwrap();
        assert_eq!(m2.link.unwrap().label(), "Customer: CUST-001");

        let err = backend
            .attach_conversation_to_record(&PhoneNumber::new("+1999"), &target)
            .unwrap_err();
        assert_eq!(err.user_message(), "No SMS messages found");
    }

    #[test]
    fn test_attach_selected_messages_only() {
        let backend = InMemoryBackend::new();
        backend.add_message(inbound("m1", "+1555", 1), false);
        backend.add_message(inbound("m2", "+1555", 2), false);
        let target = LinkTarget::new(RecordType::Project, "PROJ-7").unwrap();
        let selection = SelectedMessages::new(vec![MessageId::new("m2")]).unwrap();

        backend
            .attach_sms_messages_to_record(&selection, &target)
            .unwrap();
        assert!(backend.message(&MessageId::new("m1")).unwrap().link.is_none());
        assert!(backend.message(&MessageId::new("m2")).unwrap().link.is_some());
    }

    #[test]
    fn test_receive_builds_push_payload() {
        let backend = InMemoryBackend::new();
        backend.add_message(inbound("m1", "+61400111222", 1), true);
        backend.set_contact_name(&PhoneNumber::new("+61400111222"), "Jane Builder");

        let long_body = "x".repeat(60);
        let payload = backend.receive("0400 111 222", &long_body, at(10) + Duration::seconds(1));
        assert_eq!(payload["phone"], "+61400111222");
        assert_eq!(payload["sender"], "Jane Builder");
        assert_eq!(payload["new_count"], 1);
        assert_eq!(payload["preview"], format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_fail_next_is_one_shot_and_logged() {
        let backend = InMemoryBackend::new();
        backend.fail_next(SmsError::transport("offline"));
        assert!(backend.get_conversations().is_err());
        assert!(backend.get_conversations().is_ok());
        assert_eq!(
            backend.calls(),
            vec![BackendCall::GetConversations, BackendCall::GetConversations]
        );
    }

    #[test]
    fn test_contact_phone_prefers_mobile() {
        let backend = InMemoryBackend::new();
        backend.add_contact("Jane Builder", Some("0400111222"), Some("0730000000"));
        backend.add_contact("Front Desk", Some(""), Some("0730000001"));
        assert_eq!(
            backend.contact_phone("Jane Builder").unwrap().as_deref(),
            Some("0400111222")
        );
        assert_eq!(
            backend.contact_phone("Front Desk").unwrap().as_deref(),
            Some("0730000001")
        );
        assert!(backend.contact_phone("Nobody").unwrap().is_none());
    }
}
