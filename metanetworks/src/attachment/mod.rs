//! Attachments of network elements to parent resources

mod error;
mod id;
mod reconciler;
pub mod wait;

pub use error::AttachmentError;
pub use id::{AttachmentId, SEPARATOR};
pub use reconciler::{AttachmentReconciler, Membership};
pub use wait::{wait_for, Step, WaitConfig, WaitError};
