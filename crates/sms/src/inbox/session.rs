//! The inbox facade the host drives

use chrono::{DateTime, Local, TimeZone, Utc};
use log::{debug, info, warn};
use std::fmt::Display;
use std::sync::Arc;

use super::badge::Badge;
use super::compose::{Composer, NewMessageForm};
use super::linking;
use super::notice::{Notice, Notices};
use super::realtime::{PushEvent, Reconciler};
use super::render::{ConversationListView, ThreadRenderer, ThreadView};
use super::request::{
    Outcome, Reaction, Reply, Request, RequestLedger, Response, SendOrigin, Ticket,
};
use super::selection::SelectionController;
use super::store::{ConversationStore, ThreadUpdate};
use crate::error::SmsError;
use crate::models::{Conversation, LinkTarget, MessageId, PhoneNumber};

/// Text of the toast shown after a successful send
pub const SENT_TOAST: &str = "SMS sent!";

/// Conversation/message state for one inbox page
///
/// Every operation that needs the backend returns [`Ticket`]s for the host to
/// run. Results come back through [`Inbox::handle_response`], which drops
/// anything that no longer matches what is on screen.
pub struct Inbox<Tz = Local> {
    ledger: RequestLedger,
    store: ConversationStore,
    selection: SelectionController,
    renderer: ThreadRenderer<Tz>,
    reconciler: Reconciler,
    composer: Composer,
    new_message: NewMessageForm,
    notices: Notices,
    badge: Arc<Badge>,
    default_country_code: String,
}

impl<Tz: TimeZone> Inbox<Tz>
where
    Tz::Offset: Display,
{
    /// Create an inbox rendering dates in `display_zone`
    pub fn new(
        badge: Arc<Badge>,
        display_zone: Tz,
        default_country_code: impl Into<String>,
    ) -> Self {
        Self {
            ledger: RequestLedger::new(),
            store: ConversationStore::new(),
            selection: SelectionController::new(),
            renderer: ThreadRenderer::new(display_zone),
            reconciler: Reconciler::new(Arc::clone(&badge)),
            composer: Composer::default(),
            new_message: NewMessageForm::default(),
            notices: Notices::default(),
            badge,
            default_country_code: default_country_code.into(),
        }
    }

    pub fn badge(&self) -> &Badge {
        &self.badge
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn new_message_form(&self) -> &NewMessageForm {
        &self.new_message
    }

    /// Requests issued but not yet answered
    pub fn pending_requests(&self) -> usize {
        self.ledger.pending_count()
    }

    // ---------------------------------------------------------------------
    // Conversations
    // ---------------------------------------------------------------------

    /// Fetch the full conversation list
    pub fn load_conversations(&mut self) -> Vec<Ticket> {
        vec![self.ledger.issue(Request::ListConversations)]
    }

    /// Make `conversation` current and fetch its thread
    ///
    /// Selection is reset immediately. The conversation becomes current before
    /// the fetch is issued, so the last of several rapid switches wins.
    pub fn load_conversation(&mut self, conversation: Conversation) -> Vec<Ticket> {
        self.selection.reset();
        let ticket = self.ledger.issue(Request::LoadThread {
            phone: conversation.phone.clone(),
        });
        self.store.begin_thread(conversation, ticket.id);
        vec![ticket]
    }

    /// Open a conversation from the loaded list by number
    pub fn open(&mut self, phone: &PhoneNumber) -> Result<Vec<Ticket>, SmsError> {
        let conversation = self
            .store
            .find(phone)
            .cloned()
            .ok_or_else(|| SmsError::invalid_input(format!("No conversation with {phone}")))?;
        Ok(self.load_conversation(conversation))
    }

    fn reload_current(&mut self) -> Vec<Ticket> {
        match self.store.current().cloned() {
            Some(conversation) => self.load_conversation(conversation),
            None => Vec::new(),
        }
    }

    /// Reload the list and, if one is open, the current conversation
    pub fn refresh(&mut self) -> Vec<Ticket> {
        let mut tickets = self.load_conversations();
        tickets.extend(self.reload_current());
        tickets
    }

    pub fn set_search_filter(&mut self, text: &str) {
        self.store.set_search_filter(text);
    }

    /// Flag the latest inbound message from `phone` unread
    pub fn mark_unread(&mut self, phone: &PhoneNumber) -> Vec<Ticket> {
        vec![self.ledger.issue(Request::MarkUnread {
            phone: phone.clone(),
        })]
    }

    // ---------------------------------------------------------------------
    // Selection and linking
    // ---------------------------------------------------------------------

    pub fn toggle_selection(&mut self, value: Option<bool>) {
        if self.store.current().is_none() {
            debug!("Ignoring selection toggle with no open conversation");
            return;
        }
        self.selection.toggle(value);
    }

    pub fn set_message_selected(&mut self, id: &MessageId, selected: bool) {
        self.selection
            .set_message_selected(id, selected, self.store.thread());
    }

    pub fn selected_count(&self) -> usize {
        self.selection.selected_count()
    }

    /// Link every message with `phone` to `target`
    pub fn attach_conversation(&mut self, phone: &PhoneNumber, target: LinkTarget) -> Vec<Ticket> {
        vec![
            self.ledger
                .issue(linking::attach_conversation(phone, target)),
        ]
    }

    /// Link the checked messages to `target`; nothing is issued when none are checked
    pub fn attach_selected(&mut self, target: LinkTarget) -> Vec<Ticket> {
        match linking::attach_selected(&self.selection, target) {
            Some(request) => vec![self.ledger.issue(request)],
            None => {
                debug!("Attach requested with no messages selected");
                Vec::new()
            }
        }
    }

    // ---------------------------------------------------------------------
    // Composing
    // ---------------------------------------------------------------------

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.composer.set_draft(text);
    }

    /// Send the draft to the open conversation
    pub fn send_reply(&mut self) -> Vec<Ticket> {
        let Some(sms) = self
            .store
            .current()
            .and_then(|conversation| self.composer.prepare(conversation))
        else {
            return Vec::new();
        };
        let body = sms.body.clone();
        let ticket = self.ledger.issue(Request::Send {
            sms,
            origin: SendOrigin::Thread,
        });
        self.composer.begin(ticket.id, body);
        vec![ticket]
    }

    pub fn open_new_message(&mut self) {
        self.new_message.open();
    }

    pub fn close_new_message(&mut self) {
        self.new_message.close();
    }

    /// Choose a contact in the new message form and look up its number
    pub fn choose_contact(&mut self, contact: &str) -> Vec<Ticket> {
        match self.new_message.set_contact(contact) {
            Some(contact) => {
                let ticket = self.ledger.issue(Request::LookupContact { contact });
                self.new_message.begin_lookup(ticket.id);
                vec![ticket]
            }
            None => Vec::new(),
        }
    }

    pub fn set_new_message_phone(&mut self, phone: impl Into<String>) {
        self.new_message.set_phone(phone);
    }

    pub fn set_new_message_body(&mut self, body: impl Into<String>) {
        self.new_message.set_message(body);
    }

    /// Validate and send the new message form
    pub fn submit_new_message(&mut self) -> Result<Vec<Ticket>, SmsError> {
        let sms = self.new_message.prepare(&self.default_country_code)?;
        let ticket = self.ledger.issue(Request::Send {
            sms,
            origin: SendOrigin::NewMessage,
        });
        self.new_message.begin_send(ticket.id);
        Ok(vec![ticket])
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// React to a push event
    pub fn handle_push(&mut self, event: &PushEvent) -> Vec<Ticket> {
        let action = self.reconciler.apply(event, self.store.current_phone());
        if let Some(notice) = action.notice {
            self.notices.push(notice);
        }
        let mut tickets = Vec::new();
        if action.reload_list {
            tickets.extend(self.load_conversations());
        }
        if action.reload_thread {
            tickets.extend(self.reload_current());
        }
        tickets
    }

    /// Apply a completed request
    pub fn handle_response(&mut self, response: Response) -> Reaction {
        let Response { id, result } = response;
        let Some(request) = self.ledger.resolve(id) else {
            debug!("Discarding response {} with no pending request", id);
            return Reaction::new(Outcome::Discarded);
        };

        match request {
            Request::ListConversations => {
                let outcome = self
                    .store
                    .apply_list(id, result.and_then(Reply::into_conversations));
                if outcome == Outcome::Applied {
                    self.badge.update_count(self.store.unread_total());
                }
                Reaction::new(outcome)
            }
            Request::LoadThread { phone } => {
                let update = self
                    .store
                    .apply_thread(id, &phone, result.and_then(Reply::into_thread));
                let reaction = Reaction::new(update.outcome());
                match update {
                    ThreadUpdate::Applied { mark_read: true } => {
                        reaction.with_requests(vec![self.ledger.issue(Request::MarkRead { phone })])
                    }
                    _ => reaction,
                }
            }
            Request::MarkRead { phone } => match result.and_then(Reply::into_unread_total) {
                Ok(total) => {
                    debug!("Marked {} read; {} unread remain", phone, total);
                    self.badge.update_count(total);
                    Reaction::new(Outcome::Applied)
                }
                Err(e) => {
                    warn!("Failed to mark {} read: {}", phone, e);
                    Reaction::new(Outcome::Failed)
                }
            },
            Request::MarkUnread { phone } => match result.and_then(Reply::into_unread_total) {
                Ok(total) => {
                    info!("Marked {} unread; {} unread total", phone, total);
                    self.badge.update_count(total);
                    Reaction::new(Outcome::Applied).with_requests(self.load_conversations())
                }
                Err(e) => {
                    self.notices.push(Notice::error(&e));
                    Reaction::new(Outcome::Failed)
                }
            },
            Request::Send { sms, origin } => {
                let result = result.and_then(Reply::into_sent);
                let outcome = match origin {
                    SendOrigin::Thread => self.composer.finish(id, result.is_ok()),
                    SendOrigin::NewMessage => self.new_message.finish(id, result.is_ok()),
                };
                if outcome == Outcome::Discarded {
                    return Reaction::new(outcome);
                }
                match result {
                    Ok(receipt) => {
                        info!(
                            "Sent SMS to {} ({})",
                            sms.recipient,
                            receipt.log_name.as_deref().unwrap_or("no log")
                        );
                        self.notices.push(Notice::toast(SENT_TOAST));
                        let follow_up = match origin {
                            SendOrigin::Thread => self.reload_current(),
                            SendOrigin::NewMessage => self.load_conversations(),
                        };
                        Reaction::new(outcome).with_requests(follow_up)
                    }
                    Err(e) => {
                        warn!("Failed to send SMS to {}: {}", sms.recipient, e);
                        self.notices.push(Notice::error(&e));
                        Reaction::new(outcome)
                    }
                }
            }
            Request::AttachConversation { .. } | Request::AttachMessages { .. } => {
                let outcome =
                    linking::settle(&request, result, &mut self.selection, &mut self.notices);
                let reaction = Reaction::new(outcome);
                if outcome == Outcome::Applied {
                    let follow_up = self.reload_current();
                    reaction.with_requests(follow_up)
                } else {
                    reaction
                }
            }
            Request::LookupContact { contact } => Reaction::new(self.new_message.apply_lookup(
                id,
                &contact,
                result.and_then(Reply::into_contact_phone),
            )),
        }
    }

    pub fn has_notices(&self) -> bool {
        !self.notices.is_empty()
    }

    /// Notices queued since the last drain, oldest first
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// The filtered conversation list as of `now`
    pub fn conversation_list(&self, now: DateTime<Utc>) -> ConversationListView {
        self.renderer
            .render_list(&self.store.filtered(), self.store.current_phone(), now)
    }

    /// The open conversation, if any
    pub fn thread_view(&self) -> Option<ThreadView> {
        let conversation = self.store.current()?;
        Some(self.renderer.render(
            conversation,
            self.store.thread(),
            &self.selection,
            self.store.is_loading(),
        ))
    }
}
