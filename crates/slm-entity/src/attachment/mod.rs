//! Media library attachments.

pub mod model;

pub use model::{Attachment, AttachmentStatus};
