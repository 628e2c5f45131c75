//! The conversion pipeline: fetch body, rasterize, assemble, report.
//!
//! Runs strictly forward. A missing body or a failed capture aborts the run
//! before any PDF exists; a failing attachment is logged, recorded in the
//! report and skipped.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::model::attachment::{AttachmentKind, AttachmentMeta};
use crate::pdf::PdfAssembler;
use crate::render::Rasterizer;
use crate::store::MailSource;

/// Options that shape a single conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Page width and height in points for generated pages.
    pub page_size: (f32, f32),
    /// Append attachments marked inline.
    pub include_inline: bool,
}

impl From<&Config> for ConvertOptions {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page.size_points(),
            include_inline: config.attachments.include_inline,
        }
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Why an attachment contributed no pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither a PDF nor an image.
    UnsupportedType,
    /// Inline part, excluded by configuration.
    Inline,
    /// The content could not be retrieved.
    FetchFailed(String),
    /// The content could not be decoded as a PDF or image.
    DecodeFailed(String),
}

/// What happened to one attachment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttachmentOutcome {
    Appended { pages: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentReport {
    pub id: usize,
    pub filename: String,
    pub content_type: String,
    pub kind: AttachmentKind,
    pub outcome: AttachmentOutcome,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub subject: String,
    pub page_count: usize,
    pub attachments: Vec<AttachmentReport>,
    #[serde(skip)]
    pub pdf: Vec<u8>,
}

impl Conversion {
    pub fn appended_count(&self) -> usize {
        self.attachments
            .iter()
            .filter(|a| matches!(a.outcome, AttachmentOutcome::Appended { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.attachments.len() - self.appended_count()
    }
}

/// Decide up front what would happen to an attachment, without fetching it.
pub fn plan_attachment(meta: &AttachmentMeta, options: &ConvertOptions) -> Option<SkipReason> {
    if meta.is_inline && !options.include_inline {
        return Some(SkipReason::Inline);
    }
    match meta.kind() {
        AttachmentKind::Unsupported => Some(SkipReason::UnsupportedType),
        AttachmentKind::Pdf | AttachmentKind::Image => None,
    }
}

/// Convert the email behind `source` into a single PDF.
///
/// The progress callback receives `(processed, total)` attachment counts.
pub fn convert(
    source: &dyn MailSource,
    rasterizer: &dyn Rasterizer,
    options: &ConvertOptions,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<Conversion> {
    let html = source.body_html().inspect_err(|e| {
        tracing::error!(error = %e, "Failed to retrieve email content");
    })?;

    let body = rasterizer.rasterize(&html).inspect_err(|e| {
        tracing::error!(error = %e, "Error converting HTML to image");
    })?;

    let (page_width, page_height) = options.page_size;
    let mut pdf = PdfAssembler::new(page_width, page_height);
    pdf.add_body_page(&body)?;

    let attachments = source.attachments();
    let total = attachments.len();
    let mut reports = Vec::with_capacity(total);

    for (i, meta) in attachments.iter().enumerate() {
        if let Some(report_progress) = progress {
            report_progress(i, total);
        }
        let outcome = append_attachment(&mut pdf, source, meta, options);
        if let AttachmentOutcome::Skipped(reason) = &outcome {
            warn!(
                attachment = meta.id,
                filename = %meta.filename,
                content_type = %meta.content_type,
                ?reason,
                "Skipping attachment"
            );
        }
        reports.push(AttachmentReport {
            id: meta.id,
            filename: meta.filename.clone(),
            content_type: meta.content_type.clone(),
            kind: meta.kind(),
            outcome,
        });
    }
    if let Some(report_progress) = progress {
        report_progress(total, total);
    }

    let page_count = pdf.page_count();
    let bytes = pdf.finish()?;
    info!(pages = page_count, attachments = total, "Assembled PDF");

    Ok(Conversion {
        subject: source.subject().to_string(),
        page_count,
        attachments: reports,
        pdf: bytes,
    })
}

fn append_attachment(
    pdf: &mut PdfAssembler,
    source: &dyn MailSource,
    meta: &AttachmentMeta,
    options: &ConvertOptions,
) -> AttachmentOutcome {
    if let Some(reason) = plan_attachment(meta, options) {
        return AttachmentOutcome::Skipped(reason);
    }

    let content = match source.attachment_content(meta.id) {
        Ok(content) => content,
        Err(e) => return AttachmentOutcome::Skipped(SkipReason::FetchFailed(e.to_string())),
    };

    let appended = match meta.kind() {
        AttachmentKind::Pdf => pdf.append_pdf(&content),
        AttachmentKind::Image => pdf.append_image(&content).map(|()| 1),
        AttachmentKind::Unsupported => {
            return AttachmentOutcome::Skipped(SkipReason::UnsupportedType)
        }
    };

    match appended {
        Ok(pages) => AttachmentOutcome::Appended { pages },
        Err(e) => AttachmentOutcome::Skipped(SkipReason::DecodeFailed(e.to_string())),
    }
}
