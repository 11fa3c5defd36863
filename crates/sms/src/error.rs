//! Error taxonomy shared by the backend boundary and the inbox core

/// Fallback text shown when the backend gives no reason for a failure
pub const GENERIC_FAILURE: &str = "Failed";

/// Errors surfaced by backend calls, payload validation, and form input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SmsError {
    /// The request never produced a usable answer (network, HTTP status, timeout)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The backend answered `success: false`
    #[error("Rejected by backend: {}", message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Rejected { message: Option<String> },

    /// A backend or push payload did not match the expected shape
    #[error("Invalid payload: {message}")]
    InvalidPayload { message: String },

    /// User-supplied input failed validation
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Settings are missing or incomplete
    #[error("Not configured: {message}")]
    NotConfigured { message: String },
}

impl SmsError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(message: Option<String>) -> Self {
        Self::Rejected {
            message: message.filter(|m| !m.trim().is_empty()),
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Text for a persistent error alert
    ///
    /// Backend rejections show the backend's own words; everything else shows
    /// the generic fallback unless it carries a message of its own.
    pub fn user_message(&self) -> String {
        match self {
            SmsError::Rejected { message } => message
                .clone()
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            SmsError::Transport { message }
            | SmsError::InvalidPayload { message }
            | SmsError::InvalidInput { message }
            | SmsError::NotConfigured { message } => {
                if message.trim().is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    message.clone()
                }
            }
        }
    }
}

impl From<ureq::Error> for SmsError {
    fn from(e: ureq::Error) -> Self {
        SmsError::Transport {
            message: e.to_string(),
        }
    }
}
