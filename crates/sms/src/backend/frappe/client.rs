//! Frappe API HTTP client
//!
//! Calls the `sms_inbox` whitelisted methods over `/api/method/...`.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use super::api::{AttachResult, ContactPhones, MarkResult, SendResult, SettingsResult};
use super::normalize::{normalize_conversations, normalize_messages};
use crate::backend::{AttachReceipt, OutgoingSms, SendReceipt, SmsBackend, SmsSettings};
use crate::error::SmsError;
use crate::models::{Conversation, LinkTarget, Message, PhoneNumber, SelectedMessages};
use crate::settings::Settings;

/// Frappe client for the SMS inbox API
pub struct FrappeClient {
    agent: ureq::Agent,
    base_url: Url,
    auth_header: Option<String>,
    server_offset: FixedOffset,
}

impl FrappeClient {
    /// Dotted path of the whitelisted SMS methods
    const API_MODULE: &'static str = "sms_inbox.api.twilio";

    /// Create a client from validated settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut base_url = settings.url()?;
        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build();

        Ok(Self {
            agent: ureq::Agent::new_with_config(config),
            base_url,
            auth_header: settings.auth_header(),
            server_offset: settings
                .server_offset()
                .context("Failed to read server offset")?,
        })
    }

    /// Full URL of a whitelisted method
    fn method_url(&self, method: &str) -> Result<Url, SmsError> {
        self.base_url
            .join(&format!("api/method/{method}"))
            .map_err(|e| SmsError::transport(format!("Invalid method URL for {method}: {e}")))
    }

    /// POST `args` to `method` and return the `message` field of the envelope
    ///
    /// A missing `message` comes back as `Value::Null`.
    fn call(&self, method: &str, args: Value) -> Result<Value, SmsError> {
        let url = self.method_url(method)?;
        debug!("POST {}", url);

        let mut request = self
            .agent
            .post(url.as_str())
            .header("Accept", "application/json");
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let mut response = request.send_json(&args)?;
        let status = response.status().as_u16();
        let body: Result<Value, _> = response.body_mut().read_json();

        if !(200..300).contains(&status) {
            let reason = body.ok().as_ref().and_then(server_message);
            warn!("{} returned HTTP {}", method, status);
            return Err(match (status, reason) {
                // frappe.throw surfaces as 417 with the text in _server_messages
                (417, reason) => SmsError::rejected(reason),
                (_, Some(reason)) => SmsError::transport(format!("HTTP {status}: {reason}")),
                (_, None) => SmsError::transport(format!("HTTP {status} from {method}")),
            });
        }

        let mut body =
            body.map_err(|e| SmsError::invalid_payload(format!("{method} response: {e}")))?;
        Ok(body
            .get_mut("message")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Call an SMS method and decode its result
    fn call_sms<T: DeserializeOwned>(&self, name: &str, args: Value) -> Result<T, SmsError> {
        let method = format!("{}.{}", Self::API_MODULE, name);
        let value = self.call(&method, args)?;
        serde_json::from_value(value)
            .map_err(|e| SmsError::invalid_payload(format!("{name} result: {e}")))
    }

    /// Call an SMS method that returns a list of rows
    fn call_rows(&self, name: &str, args: Value) -> Result<Vec<Value>, SmsError> {
        let method = format!("{}.{}", Self::API_MODULE, name);
        match self.call(&method, args)? {
            Value::Null => Ok(Vec::new()),
            Value::Array(rows) => Ok(rows),
            other => Err(SmsError::invalid_payload(format!(
                "{name} returned {} instead of a list",
                value_kind(&other)
            ))),
        }
    }

    fn mark(&self, name: &str, phone: &PhoneNumber) -> Result<u32, SmsError> {
        let result: MarkResult = self.call_sms(name, json!({ "phone_number": phone.as_str() }))?;
        if !result.success {
            return Err(SmsError::rejected(None));
        }
        // Older servers acknowledge without a count
        match result.new_unread_count {
            Some(n) => Ok(u32::try_from(n).unwrap_or(0)),
            None => self.unread_count(),
        }
    }

    fn attach(&self, name: &str, args: Value) -> Result<AttachReceipt, SmsError> {
        let result: AttachResult = self.call_sms(name, args)?;
        match (result.success, result.message) {
            (true, message) => Ok(AttachReceipt {
                message: message.unwrap_or_else(|| "Attached".to_string()),
            }),
            (false, message) => Err(SmsError::rejected(message)),
        }
    }
}

impl SmsBackend for FrappeClient {
    fn get_conversations(&self) -> Result<Vec<Conversation>, SmsError> {
        let rows = self.call_rows("get_conversations", json!({}))?;
        Ok(normalize_conversations(rows, &self.server_offset))
    }

    fn get_conversation_messages(&self, phone: &PhoneNumber) -> Result<Vec<Message>, SmsError> {
        let rows = self.call_rows(
            "get_conversation_messages",
            json!({ "phone_number": phone.as_str() }),
        )?;
        Ok(normalize_messages(rows, phone, &self.server_offset))
    }

    fn mark_conversation_read(&self, phone: &PhoneNumber) -> Result<u32, SmsError> {
        self.mark("mark_conversation_read", phone)
    }

    fn mark_conversation_unread(&self, phone: &PhoneNumber) -> Result<u32, SmsError> {
        self.mark("mark_conversation_unread", phone)
    }

    fn send_sms(&self, sms: &OutgoingSms) -> Result<SendReceipt, SmsError> {
        let (linked_doctype, linked_name) = match &sms.link {
            Some(link) => (Some(link.doctype.as_str()), Some(link.name.as_str())),
            None => (None, None),
        };
        let result: SendResult = self.call_sms(
            "send_sms",
            json!({
                "recipient_number": sms.recipient.as_str(),
                "message": sms.body,
                "linked_doctype": linked_doctype,
                "linked_name": linked_name,
                "contact_name": sms.contact_name,
            }),
        )?;
        if !result.success {
            return Err(SmsError::rejected(result.error));
        }
        Ok(SendReceipt {
            sid: result.sid,
            log_name: result.log_name,
            recipient: result.recipient_number.map(PhoneNumber::new),
        })
    }

    fn attach_conversation_to_record(
        &self,
        phone: &PhoneNumber,
        target: &LinkTarget,
    ) -> Result<AttachReceipt, SmsError> {
        self.attach(
            "attach_conversation_to_record",
            json!({
                "phone_number": phone.as_str(),
                "target_doctype": target.record_type.as_str(),
                "target_name": target.name,
            }),
        )
    }

    fn attach_sms_messages_to_record(
        &self,
        messages: &SelectedMessages,
        target: &LinkTarget,
    ) -> Result<AttachReceipt, SmsError> {
        let names: Vec<&str> = messages.ids().iter().map(|id| id.as_str()).collect();
        self.attach(
            "attach_sms_messages_to_record",
            json!({
                "message_names": names,
                "target_doctype": target.record_type.as_str(),
                "target_name": target.name,
            }),
        )
    }

    fn contact_phone(&self, contact: &str) -> Result<Option<String>, SmsError> {
        let value = self.call(
            "frappe.client.get_value",
            json!({
                "doctype": "Contact",
                "filters": contact,
                "fieldname": ["mobile_no", "phone"],
            }),
        )?;
        if value.is_null() {
            return Ok(None);
        }
        let phones: ContactPhones = serde_json::from_value(value)
            .map_err(|e| SmsError::invalid_payload(format!("contact phones: {e}")))?;
        Ok(preferred_phone(phones))
    }

    fn unread_count(&self) -> Result<u32, SmsError> {
        let count: Option<i64> = self.call_sms("get_unread_sms_count", json!({}))?;
        Ok(count.map(|n| u32::try_from(n).unwrap_or(0)).unwrap_or(0))
    }

    fn sms_settings(&self) -> Result<SmsSettings, SmsError> {
        let result: SettingsResult = self.call_sms("get_sms_settings", json!({}))?;
        Ok(SmsSettings {
            enabled: result.enabled,
            phone_number: result.phone_number.filter(|p| !p.is_empty()),
        })
    }
}

/// Mobile number first, then landline
fn preferred_phone(phones: ContactPhones) -> Option<String> {
    [phones.mobile_no, phones.phone]
        .into_iter()
        .flatten()
        .find(|p| !p.trim().is_empty())
}

/// Human text from a Frappe error body
///
/// `_server_messages` is a JSON string holding a list of JSON strings, each
/// an object with a `message` field.
fn server_message(body: &Value) -> Option<String> {
    if let Some(raw) = body.get("_server_messages").and_then(Value::as_str) {
        let texts: Vec<String> = serde_json::from_str::<Vec<String>>(raw)
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| {
                serde_json::from_str::<Value>(entry)
                    .ok()
                    .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            })
            .collect();
        if !texts.is_empty() {
            return Some(texts.join("\n"));
        }
    }
    body.get("exception")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
