//! `.eml` store: holds one raw RFC 5322 message and serves its body and attachments.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{MailPdfError, Result};
use crate::model::attachment::AttachmentMeta;
use crate::model::mail::MailItem;
use crate::parser::mime;

use super::MailSource;

/// A single message read fully into memory.
///
/// The message is parsed once on open for its body and attachment list;
/// attachment payloads are decoded again on each request so only one is held
/// at a time.
pub struct EmlStore {
    raw: Vec<u8>,
    item: MailItem,
}

impl EmlStore {
    /// Open an `.eml` file. `-` reads the message from standard input.
    pub fn open(path: impl AsRef<Path>, inline_cid_images: bool) -> Result<Self> {
        let path = path.as_ref();
        let raw = if path == Path::new("-") {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| MailPdfError::io(path, e))?;
            buf
        } else {
            std::fs::read(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MailPdfError::FileNotFound(path.to_path_buf())
                } else {
                    MailPdfError::io(path, e)
                }
            })?
        };
        debug!(path = %path.display(), bytes = raw.len(), "Read message");
        Self::from_bytes(raw, inline_cid_images)
    }

    /// Build a store from raw message bytes.
    pub fn from_bytes(raw: Vec<u8>, inline_cid_images: bool) -> Result<Self> {
        let item = mime::parse_mail_item(&raw, inline_cid_images)?;
        Ok(Self { raw, item })
    }
}

impl MailSource for EmlStore {
    fn subject(&self) -> &str {
        &self.item.subject
    }

    fn body_html(&self) -> Result<String> {
        Ok(self.item.html.clone())
    }

    fn attachments(&self) -> &[AttachmentMeta] {
        &self.item.attachments
    }

    fn attachment_content(&self, id: usize) -> Result<Vec<u8>> {
        debug!(attachment = id, "Extracting attachment content");
        mime::extract_attachment(&self.raw, id)
    }
}
