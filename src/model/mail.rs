//! The email being converted.

use super::attachment::AttachmentMeta;

/// Everything read from a message up front: subject, renderable body and the
/// attachment list. Attachment payloads are fetched separately by id.
#[derive(Debug, Clone)]
pub struct MailItem {
    /// Decoded subject line (empty if absent).
    pub subject: String,

    /// HTML body. Plain-text-only messages are converted to HTML; a message
    /// with no body part has an empty body.
    pub html: String,

    /// Attachment metadata, in message order.
    pub attachments: Vec<AttachmentMeta>,
}
