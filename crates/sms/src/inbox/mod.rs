//! Conversation/message state manager
//!
//! This module provides:
//! - [`Inbox`]: the facade a host drives (list, thread, selection, composing)
//! - Explicit request/response values with a stale-response guard
//! - The process-wide unread [`Badge`]
//! - Pure view models for the list and the open thread
//! - Push event validation and reconciliation

pub mod badge;
mod compose;
mod linking;
mod notice;
mod realtime;
mod render;
mod request;
mod selection;
mod session;
mod store;

pub use badge::{BADGE_HREF, Badge, BadgeView};
pub use compose::{Composer, NewMessageForm};
pub use linking::{attach_conversation, attach_selected};
pub use notice::{NEW_SMS_TOAST_DURATION, Notice, TOAST_DURATION};
pub use realtime::{
    NEW_SMS_EVENT, NewSms, PushAction, PushEvent, Reconciler, SUBSCRIPTIONS, UNREAD_COUNT_EVENT,
};
pub use render::{
    Bubble, Checkbox, CheckboxEdge, ConversationListView, ConversationRow, EMPTY_LIST_TEXT,
    SelectionAffordance, ThreadItem, ThreadRenderer, ThreadView, format_relative_time,
    truncate_preview,
};
pub use request::{
    Outcome, Reaction, Reply, Request, RequestId, RequestLedger, Response, SendOrigin, Ticket,
    execute,
};
pub use selection::SelectionController;
pub use session::{Inbox, SENT_TOAST};
pub use store::{ConversationStore, ThreadUpdate};
