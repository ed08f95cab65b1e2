//! Document assembly: concatenate normalized PDFs into one document.
//!
//! Pages keep their input order and, within each input, their page order.
//! Each input's objects are renumbered into a disjoint id range, its page
//! dictionaries are re-parented under a single new page tree, and its own
//! catalog and page-tree nodes are dropped.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use crate::error::{AppError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in hostile inputs.
const MAX_TREE_DEPTH: usize = 64;

/// Serialized merge output.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Concatenate the pages of every buffer, in order.
///
/// Any buffer that does not parse as a PDF fails the whole assembly with
/// `MalformedInput`; nothing is produced in that case.
pub fn assemble<B: AsRef<[u8]>>(buffers: &[B]) -> Result<AssembledDocument> {
    if buffers.is_empty() {
        return Err(AppError::NoValidFiles);
    }

    let mut output = Document::with_version("1.5");
    let mut next_id: u32 = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();

    for (position, buffer) in buffers.iter().enumerate() {
        let mut doc = Document::load_mem(buffer.as_ref()).map_err(|e| {
            AppError::MalformedInput(format!("input {} is not a readable PDF: {}", position + 1, e))
        })?;

        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        // get_pages is keyed by page number, so this walks in page order.
        for page_id in doc.get_pages().into_values() {
            pages.push((page_id, flatten_page(&doc, page_id)?));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or("") {
                "Catalog" | "Pages" | "Page" | "Outlines" | "Outline" => {}
                _ => {
                    output.objects.insert(object_id, object);
                }
            }
        }
    }

    output.max_id = next_id - 1;
    let pages_id = output.new_object_id();
    let page_count = pages.len();

    let mut kids = Vec::with_capacity(page_count);
    for (page_id, mut page) in pages {
        page.set("Parent", pages_id);
        output.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    output.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = output.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    output.trailer.set("Root", catalog_id);
    output.renumber_objects();

    let mut bytes = Vec::new();
    output
        .save_to(&mut bytes)
        .map_err(|e| AppError::Internal(format!("Failed to serialize merged PDF: {}", e)))?;

    tracing::debug!(
        inputs = buffers.len(),
        pages = page_count,
        bytes = bytes.len(),
        "Assembled merged document"
    );

    Ok(AssembledDocument { bytes, page_count })
}

/// Copy of a page dictionary with inherited attributes made explicit.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| AppError::MalformedInput(format!("page {:?} is unreadable: {}", page_id, e)))?
        .clone();

    for key in INHERITABLE_ATTRIBUTES {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(doc, &page, key) {
            page.set(key, value);
        }
    }
    Ok(page)
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            return None;
        }
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}
