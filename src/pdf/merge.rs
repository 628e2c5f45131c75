//! Copying the pages of one PDF into another.

use lopdf::{Document, Object, ObjectId};

use crate::error::{MailPdfError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// Move every object of `src` into `dst` and return the ids of the source
/// pages in page order.
///
/// Inherited attributes are copied onto each page first, so the pages stay
/// complete once they are re-parented under `dst`'s page tree.
pub fn import_pages(dst: &mut Document, mut src: Document) -> Result<Vec<ObjectId>> {
    if src.is_encrypted() {
        return Err(MailPdfError::EncryptedPdf);
    }
    let start_id = dst.max_id + 1;
    src.renumber_objects_with(start_id);
    let page_ids: Vec<ObjectId> = src.get_pages().values().copied().collect();
    for &page_id in &page_ids {
        flatten_inherited(&mut src, page_id);
    }
    if src.max_id > dst.max_id {
        dst.max_id = src.max_id;
    }
    dst.objects.extend(src.objects);
    Ok(page_ids)
}

fn flatten_inherited(doc: &mut Document, page_id: ObjectId) {
    let inherited: Vec<(&[u8], Object)> = {
        let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
            return;
        };
        INHERITABLE
            .iter()
            .filter(|key| !page.has(key))
            .filter_map(|key| inherited_attribute(doc, page, key).map(|value| (*key, value)))
            .collect()
    };

    if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
}

/// Look `key` up on the ancestors of `page`, nearest first.
fn inherited_attribute(doc: &Document, page: &lopdf::Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_object(parent?).and_then(Object::as_dict).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}
