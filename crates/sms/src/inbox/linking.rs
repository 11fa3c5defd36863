//! Attaching conversations and selected messages to business records

use log::{info, warn};

use super::notice::{Notice, Notices};
use super::request::{Outcome, Reply, Request};
use super::selection::SelectionController;
use crate::error::SmsError;
use crate::models::{LinkTarget, PhoneNumber};

/// Request linking every message exchanged with `phone`
pub fn attach_conversation(phone: &PhoneNumber, target: LinkTarget) -> Request {
    Request::AttachConversation {
        phone: phone.clone(),
        target,
    }
}

/// Request linking the checked messages
///
/// `None` when nothing is checked; there is no request for an empty selection.
pub fn attach_selected(selection: &SelectionController, target: LinkTarget) -> Option<Request> {
    selection
        .selection()
        .map(|messages| Request::AttachMessages { messages, target })
}

/// Settle an attach response
///
/// On success the receipt is toasted and, for a message attach, selection
/// mode ends. On failure nothing local changes and the error is alerted.
/// Returns the outcome; the caller reloads the open conversation on
/// `Applied`.
pub fn settle(
    request: &Request,
    result: Result<Reply, SmsError>,
    selection: &mut SelectionController,
    notices: &mut Notices,
) -> Outcome {
    match result.and_then(Reply::into_attached) {
        Ok(receipt) => {
            info!("{}: {}", request.kind(), receipt.message);
            if matches!(request, Request::AttachMessages { .. }) {
                selection.reset();
            }
            notices.push(Notice::toast(receipt.message));
            Outcome::Applied
        }
        Err(e) => {
            warn!("{} failed: {}", request.kind(), e);
            notices.push(Notice::error(&e));
            Outcome::Failed
        }
    }
}
