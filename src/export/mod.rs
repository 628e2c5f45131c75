//! Export of the assembled document.

pub mod pdf;

/// File name of the produced document.
pub const DEFAULT_FILENAME: &str = "email_with_attachments.pdf";

/// Media type of the produced document.
pub const MIME_TYPE: &str = "application/pdf";
