//! Selection mode over the open thread

use std::collections::BTreeSet;

use crate::models::{Message, MessageId, SelectedMessages};

/// Tracks selection mode and the checked message ids
///
/// The selected set only ever holds ids from the thread it was given and is
/// empty whenever selection mode is off.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionController {
    active: bool,
    selected: BTreeSet<MessageId>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Flip selection mode, or set it explicitly
    pub fn toggle(&mut self, value: Option<bool>) {
        self.active = value.unwrap_or(!self.active);
        if !self.active {
            self.selected.clear();
        }
    }

    /// Check or uncheck a message of `thread`
    ///
    /// Ignored outside selection mode and for ids not in the thread.
    pub fn set_message_selected(&mut self, id: &MessageId, selected: bool, thread: &[Message]) {
        if !self.active || !thread.iter().any(|m| &m.id == id) {
            return;
        }
        if selected {
            self.selected.insert(id.clone());
        } else {
            self.selected.remove(id);
        }
    }

    pub fn is_selected(&self, id: &MessageId) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Leave selection mode with nothing selected
    pub fn reset(&mut self) {
        self.toggle(Some(false));
    }

    /// The checked messages, or `None` when nothing is checked
    pub fn selection(&self) -> Option<SelectedMessages> {
        SelectedMessages::new(self.selected.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhoneNumber;

    fn thread() -> Vec<Message> {
        ["m1", "m2", "m3"]
            .iter()
            .map(|id| Message::builder(MessageId::new(*id), PhoneNumber::new("+1555")).build())
            .collect()
    }

    #[test]
    fn test_inactive_ignores_checks() {
        let mut sel = SelectionController::new();
        sel.set_message_selected(&MessageId::new("m1"), true, &thread());
        assert_eq!(sel.selected_count(), 0);
    }

    #[test]
    fn test_toggle_off_clears() {
        let mut sel = SelectionController::new();
        let thread = thread();
        sel.toggle(None);
        sel.set_message_selected(&MessageId::new("m1"), true, &thread);
        sel.set_message_selected(&MessageId::new("m2"), true, &thread);
        assert_eq!(sel.selected_count(), 2);

        sel.toggle(None);
        assert!(!sel.is_active());
        assert_eq!(sel.selected_count(), 0);

        sel.toggle(Some(true));
        assert_eq!(sel.selected_count(), 0);
    }

    #[test]
    fn test_unknown_ids_are_inert() {
        let mut sel = SelectionController::new();
        sel.toggle(Some(true));
        sel.set_message_selected(&MessageId::new("elsewhere"), true, &thread());
        assert_eq!(sel.selected_count(), 0);
        assert!(sel.selection().is_none());
    }

    #[test]
    fn test_uncheck_and_selection() {
        let mut sel = SelectionController::new();
        let thread = thread();
        sel.toggle(Some(true));
        sel.set_message_selected(&MessageId::new("m3"), true, &thread);
        sel.set_message_selected(&MessageId::new("m1"), true, &thread);
        sel.set_message_selected(&MessageId::new("m3"), false, &thread);
        assert!(sel.is_selected(&MessageId::new("m1")));
        assert!(!sel.is_selected(&MessageId::new("m3")));
        assert_eq!(sel.selection().unwrap().len(), 1);

        sel.reset();
        assert!(!sel.is_active());
        assert!(sel.selection().is_none());
    }
}
