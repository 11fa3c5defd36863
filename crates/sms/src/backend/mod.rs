//! Backend boundary
//!
//! The inbox core talks to the record-keeping system only through
//! [`SmsBackend`]. Two implementations are provided: [`FrappeClient`] for a
//! live site and [`InMemoryBackend`] for tests and offline runs.

pub mod frappe;
mod memory;
mod traits;

pub use frappe::FrappeClient;
pub use memory::{BackendCall, InMemoryBackend};
pub use traits::{AttachReceipt, OutgoingSms, SendReceipt, SmsBackend, SmsSettings};
