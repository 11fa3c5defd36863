//! User-facing notifications queued for the host

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::SmsError;

/// Default lifetime of a transient toast
pub const TOAST_DURATION: Duration = Duration::from_secs(5);

/// Lifetime of the new-SMS toast
pub const NEW_SMS_TOAST_DURATION: Duration = Duration::from_secs(10);

/// A notification for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Auto-dismissing success message
    Toast { message: String, duration: Duration },
    /// Persistent message the user must dismiss
    Alert { title: String, message: String },
}

impl Notice {
    pub fn toast(message: impl Into<String>) -> Self {
        Notice::Toast {
            message: message.into(),
            duration: TOAST_DURATION,
        }
    }

    /// Persistent error alert carrying the backend's text or the fallback
    pub fn error(err: &SmsError) -> Self {
        Notice::Alert {
            title: "Error".to_string(),
            message: err.user_message(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::Toast { message, .. } | Notice::Alert { message, .. } => message,
        }
    }
}

/// FIFO of notices waiting to be shown
#[derive(Debug, Default)]
pub struct Notices {
    queue: VecDeque<Notice>,
}

impl Notices {
    pub fn push(&mut self, notice: Notice) {
        self.queue.push_back(notice);
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
