//! Request/response values exchanged between the inbox and its host
//!
//! The inbox never calls the backend itself. Each operation hands back
//! [`Ticket`]s; the host runs them (usually off its event loop) with
//! [`execute`] and feeds the [`Response`] into `Inbox::handle_response`.

use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;

use crate::backend::{AttachReceipt, OutgoingSms, SendReceipt, SmsBackend};
use crate::error::SmsError;
use crate::models::{Conversation, LinkTarget, Message, PhoneNumber, SelectedMessages};

/// Monotonic identifier of an issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a send was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOrigin {
    /// Reply box of the open conversation
    Thread,
    /// New message form
    NewMessage,
}

/// A backend operation the inbox wants performed
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ListConversations,
    LoadThread { phone: PhoneNumber },
    MarkRead { phone: PhoneNumber },
    MarkUnread { phone: PhoneNumber },
    Send { sms: OutgoingSms, origin: SendOrigin },
    AttachConversation { phone: PhoneNumber, target: LinkTarget },
    AttachMessages { messages: SelectedMessages, target: LinkTarget },
    LookupContact { contact: String },
}

impl Request {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Request::ListConversations => "list_conversations",
            Request::LoadThread { .. } => "load_thread",
            Request::MarkRead { .. } => "mark_read",
            Request::MarkUnread { .. } => "mark_unread",
            Request::Send { .. } => "send",
            Request::AttachConversation { .. } => "attach_conversation",
            Request::AttachMessages { .. } => "attach_messages",
            Request::LookupContact { .. } => "lookup_contact",
        }
    }
}

/// An issued request, tagged with its id
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: RequestId,
    pub request: Request,
}

/// Successful result of a request
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Conversations(Vec<Conversation>),
    Thread(Vec<Message>),
    /// Unread total after a mark read/unread
    UnreadTotal(u32),
    Sent(SendReceipt),
    Attached(AttachReceipt),
    ContactPhone(Option<String>),
}

impl Reply {
    fn mismatch(self, expected: &str) -> SmsError {
        SmsError::invalid_payload(format!("expected {expected} reply, got {self:?}"))
    }

    pub fn into_conversations(self) -> Result<Vec<Conversation>, SmsError> {
        match self {
            Reply::Conversations(rows) => Ok(rows),
            other => Err(other.mismatch("conversations")),
        }
    }

    pub fn into_thread(self) -> Result<Vec<Message>, SmsError> {
        match self {
            Reply::Thread(messages) => Ok(messages),
            other => Err(other.mismatch("thread")),
        }
    }

    pub fn into_unread_total(self) -> Result<u32, SmsError> {
        match self {
            Reply::UnreadTotal(n) => Ok(n),
            other => Err(other.mismatch("unread total")),
        }
    }

    pub fn into_sent(self) -> Result<SendReceipt, SmsError> {
        match self {
            Reply::Sent(receipt) => Ok(receipt),
            other => Err(other.mismatch("send")),
        }
    }

    pub fn into_attached(self) -> Result<AttachReceipt, SmsError> {
        match self {
            Reply::Attached(receipt) => Ok(receipt),
            other => Err(other.mismatch("attach")),
        }
    }

    pub fn into_contact_phone(self) -> Result<Option<String>, SmsError> {
        match self {
            Reply::ContactPhone(phone) => Ok(phone),
            other => Err(other.mismatch("contact phone")),
        }
    }
}

/// Completed request, as fed back to the inbox
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub result: Result<Reply, SmsError>,
}

/// What handling a response did to local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was applied
    Applied,
    /// The request failed; local state is as it was
    Failed,
    /// The response no longer matched local state and was dropped
    Discarded,
}

/// Result of handling a response: its outcome plus follow-up requests
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub outcome: Outcome,
    pub requests: Vec<Ticket>,
}

impl Reaction {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            requests: Vec::new(),
        }
    }

    pub fn with_requests(mut self, requests: Vec<Ticket>) -> Self {
        self.requests = requests;
        self
    }
}

/// Issues ticket ids and remembers which requests are still outstanding
#[derive(Debug, Default)]
pub struct RequestLedger {
    last_id: u64,
    pending: HashMap<RequestId, Request>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, request: Request) -> Ticket {
        self.last_id += 1;
        let id = RequestId(self.last_id);
        debug!("Issuing {} {}", request.kind(), id);
        self.pending.insert(id, request.clone());
        Ticket { id, request }
    }

    /// Take the request a response answers; `None` for unknown or repeated ids
    pub fn resolve(&mut self, id: RequestId) -> Option<Request> {
        self.pending.remove(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Run a ticket against a backend
pub fn execute(backend: &dyn SmsBackend, ticket: &Ticket) -> Response {
    let result = match &ticket.request {
        Request::ListConversations => backend.get_conversations().map(Reply::Conversations),
        Request::LoadThread { phone } => {
            backend.get_conversation_messages(phone).map(Reply::Thread)
        }
        Request::MarkRead { phone } => {
            backend.mark_conversation_read(phone).map(Reply::UnreadTotal)
        }
        Request::MarkUnread { phone } => backend
            .mark_conversation_unread(phone)
            .map(Reply::UnreadTotal),
        Request::Send { sms, .. } => backend.send_sms(sms).map(Reply::Sent),
        Request::AttachConversation { phone, target } => backend
            .attach_conversation_to_record(phone, target)
            .map(Reply::Attached),
        Request::AttachMessages { messages, target } => backend
            .attach_sms_messages_to_record(messages, target)
            .map(Reply::Attached),
        Request::LookupContact { contact } => {
            backend.contact_phone(contact).map(Reply::ContactPhone)
        }
    };
    if let Err(e) = &result {
        warn!("{} {} failed: {}", ticket.request.kind(), ticket.id, e);
    }
    Response {
        id: ticket.id,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, InMemoryBackend};

    #[test]
    fn test_ids_increase_and_resolve_once() {
        let mut ledger = RequestLedger::new();
        let a = ledger.issue(Request::ListConversations);
        let b = ledger.issue(Request::ListConversations);
        assert!(b.id > a.id);
        assert_eq!(ledger.pending_count(), 2);

        assert_eq!(ledger.resolve(a.id), Some(Request::ListConversations));
        assert_eq!(ledger.resolve(a.id), None);
        assert_eq!(ledger.pending_count(), 1);
    }

    #[test]
    fn test_execute_maps_request_to_backend_call() {
        let backend = InMemoryBackend::new();
        let mut ledger = RequestLedger::new();
        let ticket = ledger.issue(Request::LoadThread {
            phone: PhoneNumber::new("+1555"),
        });

        let response = execute(&backend, &ticket);
        assert_eq!(response.id, ticket.id);
        assert_eq!(response.result, Ok(Reply::Thread(Vec::new())));
        assert_eq!(
            backend.calls(),
            vec![BackendCall::GetConversationMessages(PhoneNumber::new("+1555"))]
        );
    }

    #[test]
    fn test_execute_carries_failure() {
        let backend = InMemoryBackend::new();
        backend.fail_next(SmsError::transport("timed out"));
        let mut ledger = RequestLedger::new();
        let ticket = ledger.issue(Request::ListConversations);
        let response = execute(&backend, &ticket);
        assert_eq!(response.result, Err(SmsError::transport("timed out")));
    }

    #[test]
    fn test_reply_mismatch_is_invalid_payload() {
        let err = Reply::UnreadTotal(3).into_thread().unwrap_err();
        assert!(matches!(err, SmsError::InvalidPayload { .. }));
    }
}
