//! MIME message parsing: HTML body extraction, attachment listing and
//! attachment content retrieval.

use base64::Engine as _;
use mail_parser::{MessageParser, MimeHeaders, PartType};

use crate::error::{MailPdfError, Result};
use crate::model::attachment::AttachmentMeta;
use crate::model::mail::MailItem;

/// Parse a complete raw message (headers + body) into a [`MailItem`].
///
/// When `inline_cid_images` is set, `cid:` references in the HTML body are
/// replaced with `data:` URIs built from the matching inline parts.
pub fn parse_mail_item(raw_message: &[u8], inline_cid_images: bool) -> Result<MailItem> {
    let message_bytes = skip_from_line(raw_message);

    let msg = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| MailPdfError::BodyUnavailable("message could not be parsed".into()))?;

    let attachments = list_attachments_from_parsed(&msg);

    // body_html(0) also covers text/plain bodies, converting them to HTML.
    // A message made only of attachments renders as an empty body.
    let html = match msg.body_html(0) {
        Some(html) if inline_cid_images => {
            inline_cid_references(&html, |cid| data_uri_for_cid(&msg, &attachments, cid))
        }
        Some(html) => html.into_owned(),
        None => String::new(),
    };

    Ok(MailItem {
        subject: msg.subject().unwrap_or_default().to_string(),
        html,
        attachments,
    })
}

/// Decode and extract the binary content of the attachment at position `id`.
pub fn extract_attachment(raw_message: &[u8], id: usize) -> Result<Vec<u8>> {
    let message_bytes = skip_from_line(raw_message);
    let msg = MessageParser::default().parse(message_bytes).ok_or_else(|| {
        MailPdfError::BodyUnavailable("message could not be parsed for attachment extraction".into())
    })?;

    let part = msg
        .attachment(id)
        .ok_or(MailPdfError::AttachmentNotFound(id))?;

    part_content(part, id)
}

/// Raw payload of a leaf part. Embedded messages and nested multiparts have none.
fn part_content(part: &mail_parser::MessagePart<'_>, id: usize) -> Result<Vec<u8>> {
    match &part.body {
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => Ok(bytes.to_vec()),
        PartType::Text(text) | PartType::Html(text) => Ok(text.as_bytes().to_vec()),
        PartType::Message(_) => Err(MailPdfError::UnsupportedContentFormat {
            id,
            format: "embedded message".into(),
        }),
        PartType::Multipart(_) => Err(MailPdfError::UnsupportedContentFormat {
            id,
            format: "multipart".into(),
        }),
    }
}

/// Build attachment metadata from a parsed `mail_parser::Message`.
fn list_attachments_from_parsed(msg: &mail_parser::Message<'_>) -> Vec<AttachmentMeta> {
    msg.attachments()
        .enumerate()
        .map(|(idx, part)| {
            let filename = part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{idx}"));

            let content_type = part
                .content_type()
                .map(|ct: &mail_parser::ContentType| {
                    let main = ct.ctype();
                    match ct.subtype() {
                        Some(sub) => format!("{main}/{sub}"),
                        None => main.to_string(),
                    }
                })
                .unwrap_or_else(|| "application/octet-stream".to_string())
                .to_ascii_lowercase();

            let is_inline = part
                .content_disposition()
                .map(|d: &mail_parser::ContentType| d.ctype().eq_ignore_ascii_case("inline"))
                .unwrap_or(false);

            let content_id = part
                .content_id()
                .map(|cid| cid.trim().trim_start_matches('<').trim_end_matches('>').to_string())
                .filter(|cid| !cid.is_empty());

            AttachmentMeta {
                id: idx,
                filename,
                content_type,
                size: part.contents().len() as u64,
                content_id,
                is_inline,
            }
        })
        .collect()
}

/// Build a `data:` URI for the attachment carrying Content-ID `cid`.
fn data_uri_for_cid(
    msg: &mail_parser::Message<'_>,
    attachments: &[AttachmentMeta],
    cid: &str,
) -> Option<String> {
    let meta = attachments
        .iter()
        .find(|a| a.content_id.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(cid)))?;
    let part = msg.attachment(meta.id)?;
    let bytes = part_content(part, meta.id).ok()?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Some(format!("data:{};base64,{}", meta.content_type, encoded))
}

/// Replace every `cid:<id>` reference in `html` for which `resolve` returns a
/// URI. Unresolved references are left untouched.
pub fn inline_cid_references(html: &str, resolve: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;

    while let Some(start) = find_ascii_case_insensitive(remaining, "cid:") {
        result.push_str(&remaining[..start]);
        let after = &remaining[start + 4..];
        let end = after
            .find(|c: char| matches!(c, '"' | '\'' | ')' | '>' | '<') || c.is_whitespace())
            .unwrap_or(after.len());
        let cid = &after[..end];

        match resolve(cid) {
            Some(uri) if !cid.is_empty() => result.push_str(&uri),
            _ => {
                result.push_str(&remaining[start..start + 4]);
                result.push_str(cid);
            }
        }
        remaining = &after[end..];
    }
    result.push_str(remaining);
    result
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Skip a leading `From ` separator line, as found in messages cut out of MBOX files.
fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    };

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
