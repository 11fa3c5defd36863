//! Reply box and new message form

use log::{debug, warn};

use super::request::{Outcome, RequestId};
use crate::backend::OutgoingSms;
use crate::error::SmsError;
use crate::models::Conversation;
use crate::phone::normalize;

/// Reply draft for the open conversation
#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
    /// In-flight send and the body it carries
    sending: Option<(RequestId, String)>,
}

impl Composer {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_sending(&self) -> bool {
        self.sending.is_some()
    }

    /// Label of the send affordance
    pub fn send_label(&self) -> &'static str {
        if self.is_sending() { "Sending..." } else { "Send" }
    }

    /// Outgoing reply for `conversation`, if one can be sent now
    ///
    /// Blank drafts and a send already in flight yield nothing.
    pub fn prepare(&self, conversation: &Conversation) -> Option<OutgoingSms> {
        let body = self.draft.trim();
        if body.is_empty() || self.is_sending() {
            return None;
        }
        let mut sms = OutgoingSms::new(conversation.phone.clone(), body);
        sms.link = conversation.link.clone();
        sms.contact_name = conversation.display_name.clone();
        Some(sms)
    }

    pub fn begin(&mut self, id: RequestId, body: impl Into<String>) {
        self.sending = Some((id, body.into()));
    }

    /// Settle the in-flight send
    ///
    /// On success the draft is cleared only if it still holds the text that
    /// was sent; anything typed since is kept.
    pub fn finish(&mut self, id: RequestId, success: bool) -> Outcome {
        let Some((_, body)) = self.sending.take_if(|(sending, _)| *sending == id) else {
            return Outcome::Discarded;
        };
        if success {
            if self.draft.trim() == body {
                self.draft.clear();
            } else {
                debug!("Keeping draft edited while {} was in flight", id);
            }
            Outcome::Applied
        } else {
            Outcome::Failed
        }
    }
}

/// Dialog for messaging a number that may have no conversation yet
#[derive(Debug, Default)]
pub struct NewMessageForm {
    open: bool,
    contact: Option<String>,
    phone: String,
    message: String,
    lookup: Option<RequestId>,
    sending: Option<RequestId>,
}

impl NewMessageForm {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open a blank form
    pub fn open(&mut self) {
        *self = Self {
            open: true,
            ..Self::default()
        };
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn contact(&self) -> Option<&str> {
        self.contact.as_deref()
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_sending(&self) -> bool {
        self.sending.is_some()
    }

    /// Choose a contact; returns the contact to look up, if any
    pub fn set_contact(&mut self, contact: &str) -> Option<String> {
        let contact = contact.trim();
        if contact.is_empty() {
            self.contact = None;
            self.lookup = None;
            return None;
        }
        self.contact = Some(contact.to_string());
        Some(contact.to_string())
    }

    pub fn begin_lookup(&mut self, id: RequestId) {
        self.lookup = Some(id);
    }

    /// Prefill the phone from a lookup result
    ///
    /// Applies only to the latest lookup while its contact is still chosen.
    pub fn apply_lookup(
        &mut self,
        id: RequestId,
        contact: &str,
        result: Result<Option<String>, SmsError>,
    ) -> Outcome {
        if self.lookup != Some(id) || self.contact.as_deref() != Some(contact) {
            debug!("Discarding stale contact lookup {} for {}", id, contact);
            return Outcome::Discarded;
        }
        self.lookup = None;
        match result {
            Ok(phone) => {
                self.phone = phone.unwrap_or_default();
                Outcome::Applied
            }
            Err(e) => {
                warn!("Contact lookup for {} failed: {}", contact, e);
                Outcome::Failed
            }
        }
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.phone = phone.into();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Validate the form into an outgoing message
    pub fn prepare(&self, default_country_code: &str) -> Result<OutgoingSms, SmsError> {
        if !self.open {
            return Err(SmsError::invalid_input("New message form is not open"));
        }
        if self.is_sending() {
            return Err(SmsError::invalid_input("A message is already being sent"));
        }
        let recipient = normalize(&self.phone, default_country_code)
            .ok_or_else(|| SmsError::invalid_input("Phone Number is required"))?;
        let body = self.message.trim();
        if body.is_empty() {
            return Err(SmsError::invalid_input("Message is required"));
        }
        let mut sms = OutgoingSms::new(recipient, body);
        sms.contact_name = self.contact.clone();
        Ok(sms)
    }

    pub fn begin_send(&mut self, id: RequestId) {
        self.sending = Some(id);
    }

    /// Settle the in-flight send; the form closes only on success
    pub fn finish(&mut self, id: RequestId, success: bool) -> Outcome {
        if self.sending != Some(id) {
            return Outcome::Discarded;
        }
        self.sending = None;
        if success {
            self.close();
            Outcome::Applied
        } else {
            Outcome::Failed
        }
    }
}
