//! Centralized error types for mailpdf.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailpdf library.
#[derive(Error, Debug)]
pub enum MailPdfError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified message file does not exist.
    #[error("Message file not found: {0}")]
    FileNotFound(PathBuf),

    /// The message could not be parsed, so its body cannot be retrieved.
    #[error("Email body is not available: {0}")]
    BodyUnavailable(String),

    /// The HTML body could not be captured as an image.
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    /// No attachment exists with the requested id.
    #[error("Attachment {0} not found in message")]
    AttachmentNotFound(usize),

    /// The attachment payload is not raw content (e.g. an embedded message).
    #[error("Unsupported content format for attachment {id}: {format}")]
    UnsupportedContentFormat { id: usize, format: String },

    /// The attached PDF is encrypted and its pages cannot be copied.
    #[error("Attached PDF is encrypted")]
    EncryptedPdf,

    /// A PDF could not be parsed or written.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// An image could not be decoded.
    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    /// The configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for `Result<T, MailPdfError>`.
pub type Result<T> = std::result::Result<T, MailPdfError>;

impl MailPdfError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `MailPdfError::io`).
impl From<std::io::Error> for MailPdfError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
