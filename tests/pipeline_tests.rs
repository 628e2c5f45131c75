//! End-to-end tests: `.eml` on disk → assembled PDF on disk.

use std::io::Cursor;

use assert_fs::prelude::*;
use base64::Engine as _;
use lopdf::{dictionary, Document, Object, Stream};
use predicates::prelude::*;

use mailpdf::error::{MailPdfError, Result};
use mailpdf::export::pdf::export_pdf;
use mailpdf::export::DEFAULT_FILENAME;
use mailpdf::pipeline::{convert, AttachmentOutcome, ConvertOptions, SkipReason};
use mailpdf::render::{RasterImage, Rasterizer};
use mailpdf::store::reader::EmlStore;
use mailpdf::store::MailSource;

/// Stands in for a real HTML renderer: a white bitmap at the default device width.
struct WhitePage;

impl Rasterizer for WhitePage {
    fn rasterize(&self, _html: &str) -> Result<RasterImage> {
        Ok(RasterImage::from_pixel(1640, 1200, image::Rgba([255, 255, 255, 255])))
    }
}

fn pdf_with_pages(pages: usize, width: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 m".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    // MediaBox inherited from the page tree root
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), 700.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RasterImage::from_pixel(width, height, image::Rgba([30, 60, 90, 255]))
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Build a multipart/mixed message with an HTML body and the given
/// `(filename, content type, bytes)` attachments.
fn eml(attachments: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    eml_with_body(Some("<h1>Hello Bob</h1><p>Files attached.</p>"), attachments)
}

fn eml_with_body(body: Option<&str>, attachments: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let b64 = base64::engine::general_purpose::STANDARD;
    let mut msg = String::from(
        "From: Alice <alice@example.com>\r\n\
To: bob@example.com\r\n\
Subject: Contract and scans\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"==sep==\"\r\n\
\r\n",
    );
    if let Some(body) = body {
        msg.push_str("--==sep==\r\nContent-Type: text/html; charset=utf-8\r\n\r\n");
        msg.push_str(body);
        msg.push_str("\r\n");
    }
    for (name, ctype, bytes) in attachments {
        msg.push_str("--==sep==\r\n");
        msg.push_str(&format!("Content-Type: {ctype}; name=\"{name}\"\r\n"));
        msg.push_str(&format!("Content-Disposition: attachment; filename=\"{name}\"\r\n"));
        msg.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        let encoded = b64.encode(bytes);
        for chunk in encoded.as_bytes().chunks(76) {
            msg.push_str(std::str::from_utf8(chunk).unwrap());
            msg.push_str("\r\n");
        }
    }
    msg.push_str("--==sep==--\r\n");
    msg.into_bytes()
}

fn page_widths(bytes: &[u8]) -> Vec<f32> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_object(id).and_then(Object::as_dict).unwrap();
            let media_box = page.get(b"MediaBox").and_then(Object::as_array).unwrap();
            media_box[2].as_float().unwrap()
        })
        .collect()
}

#[test]
fn test_attachments_follow_body_in_message_order() {
    let temp = assert_fs::TempDir::new().unwrap();
    let message = temp.child("message.eml");
    message
        .write_binary(&eml(&[
            ("contract.pdf", "application/pdf", pdf_with_pages(2, 300)),
            ("scan.png", "image/png", png(120, 80)),
            ("notes.docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document", b"PK\x03\x04".to_vec()),
            ("appendix.pdf", "application/pdf", pdf_with_pages(1, 450)),
        ]))
        .unwrap();

    let store = EmlStore::open(message.path(), true).unwrap();
    assert_eq!(store.subject(), "Contract and scans");
    assert_eq!(store.attachments().len(), 4);

    let conversion = convert(&store, &WhitePage, &ConvertOptions::default(), None).unwrap();
    assert_eq!(conversion.page_count, 1 + 2 + 1 + 1);
    assert_eq!(
        conversion.attachments[2].outcome,
        AttachmentOutcome::Skipped(SkipReason::UnsupportedType)
    );

    let out_dir = temp.child("out");
    let written = export_pdf(&conversion.pdf, out_dir.path(), DEFAULT_FILENAME, false).unwrap();
    out_dir
        .child(DEFAULT_FILENAME)
        .assert(predicate::path::is_file());

    let bytes = std::fs::read(written).unwrap();
    let widths = page_widths(&bytes);
    let a4 = 595.28;
    assert_eq!(widths.len(), 5);
    assert!((widths[0] - a4).abs() < 0.01, "body page is A4");
    assert_eq!(widths[1], 300.0);
    assert_eq!(widths[2], 300.0);
    assert!((widths[3] - a4).abs() < 0.01, "image page is A4");
    assert_eq!(widths[4], 450.0);
}

#[test]
fn test_message_without_attachments_is_one_page() {
    let temp = assert_fs::TempDir::new().unwrap();
    let message = temp.child("plain.eml");
    message
        .write_str("Subject: Just text\r\nContent-Type: text/plain\r\n\r\nNothing attached.\r\n")
        .unwrap();

    let store = EmlStore::open(message.path(), true).unwrap();
    let conversion = convert(&store, &WhitePage, &ConvertOptions::default(), None).unwrap();
    assert_eq!(conversion.page_count, 1);
    assert_eq!(page_widths(&conversion.pdf).len(), 1);
}

#[test]
fn test_corrupt_attachment_is_skipped() {
    let temp = assert_fs::TempDir::new().unwrap();
    let message = temp.child("broken.eml");
    message
        .write_binary(&eml(&[
            ("broken.pdf", "application/pdf", b"%PDF-1.4 garbage".to_vec()),
            ("photo.png", "image/png", png(10, 10)),
        ]))
        .unwrap();

    let store = EmlStore::open(message.path(), true).unwrap();
    let conversion = convert(&store, &WhitePage, &ConvertOptions::default(), None).unwrap();
    assert_eq!(conversion.page_count, 2);
    assert!(matches!(
        conversion.attachments[0].outcome,
        AttachmentOutcome::Skipped(SkipReason::DecodeFailed(_))
    ));
    assert_eq!(
        conversion.attachments[1].outcome,
        AttachmentOutcome::Appended { pages: 1 }
    );
}

#[test]
fn test_unparsable_message_writes_nothing() {
    let temp = assert_fs::TempDir::new().unwrap();
    let message = temp.child("empty.eml");
    message.write_binary(b"").unwrap();

    let err = EmlStore::open(message.path(), true)
        .err()
        .expect("empty message must not open");
    assert!(matches!(err, MailPdfError::BodyUnavailable(_)));
    temp.child(DEFAULT_FILENAME).assert(predicate::path::missing());
}

#[test]
fn test_attachment_only_message_gets_empty_body_page() {
    let temp = assert_fs::TempDir::new().unwrap();
    let message = temp.child("scan-only.eml");
    message
        .write_binary(&eml_with_body(
            None,
            &[("scan.pdf", "application/pdf", pdf_with_pages(2, 320))],
        ))
        .unwrap();

    let store = EmlStore::open(message.path(), true).unwrap();
    assert_eq!(store.body_html().unwrap(), "");
    let conversion = convert(&store, &WhitePage, &ConvertOptions::default(), None).unwrap();
    assert_eq!(conversion.page_count, 3);
    assert_eq!(
        conversion.attachments[0].outcome,
        AttachmentOutcome::Appended { pages: 2 }
    );

    let widths = page_widths(&conversion.pdf);
    assert!((widths[0] - 595.28).abs() < 0.01);
    assert_eq!(&widths[1..], &[320.0, 320.0]);
}

#[test]
fn test_rerun_gives_same_page_layout() {
    let temp = assert_fs::TempDir::new().unwrap();
    let message = temp.child("again.eml");
    message
        .write_binary(&eml(&[
            ("a.pdf", "application/pdf", pdf_with_pages(3, 350)),
            ("b.png", "image/png", png(50, 50)),
        ]))
        .unwrap();

    let store = EmlStore::open(message.path(), true).unwrap();
    let first = convert(&store, &WhitePage, &ConvertOptions::default(), None).unwrap();
    let second = convert(&store, &WhitePage, &ConvertOptions::default(), None).unwrap();
    assert_eq!(page_widths(&first.pdf), page_widths(&second.pdf));
}
