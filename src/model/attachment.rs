//! Attachment metadata and classification.
//!
//! The actual content is NOT loaded when listing.
//! It is decoded on demand, one attachment at a time, during assembly.

use serde::Serialize;

/// Metadata about an email attachment.
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct AttachmentMeta {
    /// Zero-based position in the message's attachment list. Used to fetch content.
    pub id: usize,

    /// Filename of the attachment. Generated if missing from the headers.
    pub filename: String,

    /// MIME content type, lowercased (e.g. `"image/jpeg"`, `"application/pdf"`).
    pub content_type: String,

    /// Decoded size in bytes.
    pub size: u64,

    /// Content-ID for inline attachments referenced from HTML, without angle brackets.
    pub content_id: Option<String>,

    /// `true` if the attachment is inline (embedded in HTML), `false` if a regular attachment.
    pub is_inline: bool,
}

/// What the assembler does with an attachment, decided from its content type alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// `application/pdf`: every page is copied.
    Pdf,
    /// `image/*`: placed centered on a new page.
    Image,
    /// Anything else: skipped.
    Unsupported,
}

impl AttachmentKind {
    /// Classify a MIME content type. Parameters (`; name=...`) are ignored.
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if essence == "application/pdf" {
            Self::Pdf
        } else if essence.starts_with("image/") {
            Self::Image
        } else {
            Self::Unsupported
        }
    }
}

impl AttachmentMeta {
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_content_type(&self.content_type)
    }
}
