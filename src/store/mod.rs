//! Message sources: where the body and attachments of the email come from.

pub mod reader;

use crate::error::Result;
use crate::model::attachment::AttachmentMeta;

/// Access to the email being converted.
///
/// The body and attachment list are available up front; attachment payloads
/// are fetched one at a time by id, only for attachments that get assembled.
pub trait MailSource {
    /// Subject line, used for reporting only.
    fn subject(&self) -> &str;

    /// The body as HTML, empty when the message has no body part. Fails with
    /// `BodyUnavailable` when the body cannot be retrieved at all.
    fn body_html(&self) -> Result<String>;

    /// Attachment descriptors in message order.
    fn attachments(&self) -> &[AttachmentMeta];

    /// Decoded bytes of the attachment with the given id.
    fn attachment_content(&self, id: usize) -> Result<Vec<u8>>;
}
