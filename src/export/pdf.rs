//! Write the assembled PDF to disk.
//!
//! The bytes go to a temporary file next to the destination which is then
//! renamed into place, so a partially written PDF never appears under the
//! final name and nothing is left behind on failure.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MailPdfError, Result};

/// Write `bytes` as `output_dir/filename` and return the path written.
///
/// `filename` is sanitized and given a `.pdf` extension if it lacks one.
/// Unless `overwrite` is set, an existing file is kept and a counter is
/// appended to the new name instead.
pub fn export_pdf(bytes: &[u8], output_dir: &Path, filename: &str, overwrite: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| MailPdfError::io(output_dir, e))?;

    let target = output_dir.join(pdf_filename(filename));
    let path = if overwrite { target } else { unique_path(&target) };

    let mut staging = tempfile::Builder::new()
        .prefix(".mailpdf-")
        .suffix(".part")
        .tempfile_in(output_dir)
        .map_err(|e| MailPdfError::io(output_dir, e))?;
    staging
        .write_all(bytes)
        .and_then(|()| staging.as_file().sync_all())
        .map_err(|e| MailPdfError::io(staging.path(), e))?;

    let persisted = if overwrite {
        staging.persist(&path)
    } else {
        staging.persist_noclobber(&path)
    };
    persisted.map_err(|e| MailPdfError::io(&path, e.error))?;

    info!(path = %path.display(), bytes = bytes.len(), "Wrote PDF");
    Ok(path)
}

/// Sanitized file name ending in `.pdf`.
fn pdf_filename(filename: &str) -> String {
    let name = sanitize_filename_part(filename, 200);
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{name}.pdf")
    }
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    // Fallback, very unlikely
    parent.join(format!("{stem}_dup.{ext}"))
}
