//! View models for the conversation list and the open thread
//!
//! Rendering is pure: the same inputs always produce the same view.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fmt::Display;

use super::selection::SelectionController;
use crate::models::{Conversation, Direction, Message, MessageId, PhoneNumber};

/// Characters of the last message shown in a list row
pub const PREVIEW_CHARS: usize = 40;

/// Text shown when no conversation matches
pub const EMPTY_LIST_TEXT: &str = "No conversations";

/// Which side of the bubble a selection checkbox sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckboxEdge {
    Leading,
    Trailing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkbox {
    pub checked: bool,
    pub edge: CheckboxEdge,
}

/// One message bubble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub id: MessageId,
    pub direction: Direction,
    pub body: String,
    /// Local `HH:MM`
    pub time: String,
    /// Sender name, outbound only
    pub sender: Option<String>,
    /// `"<doctype>: <name>"` when the message is linked
    pub link_label: Option<String>,
    pub selected: bool,
    /// Present only in selection mode
    pub checkbox: Option<Checkbox>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadItem {
    DateSeparator { date: NaiveDate, label: String },
    Bubble(Bubble),
}

/// Header controls for selection mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionAffordance {
    /// "Select" or "Selecting"
    pub toggle_label: &'static str,
    /// "Attach (n)"; shown only in selection mode
    pub attach_label: Option<String>,
    pub attach_enabled: bool,
    pub cancel_visible: bool,
}

/// Rendered open conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadView {
    pub title: String,
    pub phone: PhoneNumber,
    pub items: Vec<ThreadItem>,
    pub selection: SelectionAffordance,
    /// Message the view should scroll to after rendering
    pub scroll_to: Option<MessageId>,
    pub loading: bool,
}

impl ThreadView {
    pub fn bubbles(&self) -> impl Iterator<Item = &Bubble> {
        self.items.iter().filter_map(|item| match item {
            ThreadItem::Bubble(bubble) => Some(bubble),
            ThreadItem::DateSeparator { .. } => None,
        })
    }

    pub fn separator_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ThreadItem::DateSeparator { .. }))
            .count()
    }
}

/// One row of the conversation list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRow {
    pub phone: PhoneNumber,
    pub name: String,
    pub arrow: char,
    pub preview: String,
    /// Unread count, only when non-zero
    pub unread: Option<u32>,
    pub active: bool,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationListView {
    pub rows: Vec<ConversationRow>,
    /// Placeholder shown instead of rows
    pub empty_text: Option<&'static str>,
}

/// Renders threads and list rows in a display time zone
///
/// Each timestamp is converted with the offset in force at that instant,
/// so messages either side of a daylight saving change land on the right day.
#[derive(Debug, Clone)]
pub struct ThreadRenderer<Tz> {
    zone: Tz,
}

impl<Tz: TimeZone> ThreadRenderer<Tz>
where
    Tz::Offset: Display,
{
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> &Tz {
        &self.zone
    }

    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.zone).date_naive()
    }

    /// Render `messages` (oldest first) for `conversation`
    pub fn render(
        &self,
        conversation: &Conversation,
        messages: &[Message],
        selection: &SelectionController,
        loading: bool,
    ) -> ThreadView {
        let mut items = Vec::with_capacity(messages.len() * 2);
        let mut last_date: Option<NaiveDate> = None;

        for message in messages {
            let date = self.local_date(message.sent_at);
            if last_date != Some(date) {
                items.push(ThreadItem::DateSeparator {
                    date,
                    label: date.format("%a, %d %b %Y").to_string(),
                });
                last_date = Some(date);
            }
            items.push(ThreadItem::Bubble(self.bubble(message, selection)));
        }

        ThreadView {
            title: conversation.title().to_string(),
            phone: conversation.phone.clone(),
            items,
            selection: affordance(selection),
            scroll_to: messages.last().map(|m| m.id.clone()),
            loading,
        }
    }

    fn bubble(&self, message: &Message, selection: &SelectionController) -> Bubble {
        let selected = selection.is_selected(&message.id);
        let sender = match message.direction {
            Direction::Outbound => message.sender_name.clone().filter(|s| !s.is_empty()),
            Direction::Inbound => None,
        };
        let checkbox = selection.is_active().then(|| Checkbox {
            checked: selected,
            edge: match message.direction {
                Direction::Inbound => CheckboxEdge::Leading,
                Direction::Outbound => CheckboxEdge::Trailing,
            },
        });

        Bubble {
            id: message.id.clone(),
            direction: message.direction,
            body: message.body.clone(),
            time: message
                .sent_at
                .with_timezone(&self.zone)
                .format("%H:%M")
                .to_string(),
            sender,
            link_label: message.link.as_ref().map(|l| l.label()),
            selected,
            checkbox,
        }
    }

    /// Render the filtered list; `active` marks the open conversation
    pub fn render_list(
        &self,
        conversations: &[&Conversation],
        active: Option<&PhoneNumber>,
        now: DateTime<Utc>,
    ) -> ConversationListView {
        let rows: Vec<ConversationRow> = conversations
            .iter()
            .map(|c| ConversationRow {
                phone: c.phone.clone(),
                name: c.title().to_string(),
                arrow: c.last_direction.arrow(),
                preview: truncate_preview(&c.last_message),
                unread: (c.unread_count > 0).then_some(c.unread_count),
                active: active == Some(&c.phone),
                when: format_relative_time(c.last_message_at, now, &self.zone),
            })
            .collect();
        let empty_text = rows.is_empty().then_some(EMPTY_LIST_TEXT);
        ConversationListView { rows, empty_text }
    }
}

fn affordance(selection: &SelectionController) -> SelectionAffordance {
    let count = selection.selected_count();
    if selection.is_active() {
        SelectionAffordance {
            toggle_label: "Selecting",
            attach_label: Some(format!("Attach ({count})")),
            attach_enabled: count > 0,
            cancel_visible: true,
        }
    } else {
        SelectionAffordance {
            toggle_label: "Select",
            attach_label: None,
            attach_enabled: false,
            cancel_visible: false,
        }
    }
}

/// First characters of a message, with "..." when cut
pub fn truncate_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Format a timestamp relative to `now`
pub fn format_relative_time<Tz: TimeZone>(ts: DateTime<Utc>, now: DateTime<Utc>, zone: &Tz) -> String
where
    Tz::Offset: Display,
{
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 60 {
        "Just now".to_string()
    } else if duration.num_minutes() < 60 {
        let mins = duration.num_minutes();
        if mins == 1 {
            "1 minute ago".to_string()
        } else {
            format!("{} minutes ago", mins)
        }
    } else if duration.num_hours() < 24 {
        let hours = duration.num_hours();
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else {
        ts.with_timezone(zone).format("%b %d at %H:%M").to_string()
    }
}
