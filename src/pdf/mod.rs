//! PDF assembly: the rendered body as page 1, then attachment pages in order.

pub mod layout;
pub mod merge;
pub mod xobject;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{MailPdfError, Result};
use crate::render::RasterImage;

use self::layout::Placement;
use self::xobject::ImageXObject;

/// Builds the output document page by page.
///
/// Every page this assembler creates has the same fixed size. Pages copied
/// from attached PDFs keep their own size.
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    page_width: f32,
    page_height: f32,
}

impl PdfAssembler {
    /// Start an empty document whose generated pages are `page_width` x
    /// `page_height` points.
    pub fn new(page_width: f32, page_height: f32) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            page_width,
            page_height,
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Place the rendered body on a new first page, scaled to fit the page
    /// and anchored at the top.
    pub fn add_body_page(&mut self, body: &RasterImage) -> Result<()> {
        if body.width() == 0 || body.height() == 0 {
            return Err(MailPdfError::Rasterize("body image is empty".into()));
        }
        let xobject = xobject::from_rgba(body);
        let placement = layout::fit_top(
            xobject.width as f32,
            xobject.height as f32,
            self.page_width,
            self.page_height,
        );
        let page_id = self.image_page(xobject, placement);
        self.kids.insert(0, page_id);
        Ok(())
    }

    /// Append every page of an attached PDF, in order. Returns how many pages
    /// were added.
    pub fn append_pdf(&mut self, bytes: &[u8]) -> Result<usize> {
        let src = Document::load_mem(bytes)?;
        let page_ids = merge::import_pages(&mut self.doc, src)?;
        for &page_id in &page_ids {
            let page = self
                .doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)?;
            page.set("Parent", self.pages_id);
            if !page.has(b"MediaBox") {
                page.set("MediaBox", media_box(self.page_width, self.page_height));
            }
        }
        self.kids.extend_from_slice(&page_ids);
        debug!(pages = page_ids.len(), "Appended PDF attachment");
        Ok(page_ids.len())
    }

    /// Decode an attached image and center it on a new page.
    pub fn append_image(&mut self, bytes: &[u8]) -> Result<()> {
        let xobject = xobject::from_encoded(bytes)?;
        let placement = layout::centered(
            xobject.width as f32,
            xobject.height as f32,
            self.page_width,
            self.page_height,
        );
        debug!(width = xobject.width, height = xobject.height, "Appended image attachment");
        let page_id = self.image_page(xobject, placement);
        self.kids.push(page_id);
        Ok(())
    }

    /// Create a fixed-size page drawing `xobject` at `placement`. The page is
    /// not yet part of the page list.
    fn image_page(&mut self, xobject: ImageXObject, placement: Placement) -> ObjectId {
        let image_id = self.doc.add_object(xobject.stream);
        let content = format!(
            "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im0 Do Q\n",
            placement.width, placement.height, placement.x, placement.y
        );
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.into_bytes()));
        self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "MediaBox" => media_box(self.page_width, self.page_height),
        })
    }

    /// Close the page tree and serialize the document.
    pub fn finish(self) -> Result<Vec<u8>> {
        let Self {
            mut doc,
            pages_id,
            kids,
            ..
        } = self;

        let count = kids.len() as i64;
        let kids: Vec<Object> = kids.into_iter().map(Object::Reference).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        // Drops the catalogs and page trees left over from imported PDFs.
        doc.prune_objects();
        doc.renumber_objects();
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }
}

fn media_box(width: f32, height: f32) -> Object {
    Object::Array(vec![
        0.into(),
        0.into(),
        Object::Real(width),
        Object::Real(height),
    ])
}
