//! Copying pages between documents

use crate::document::{inherited_attribute, PdfDocument};
use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

impl PdfDocument {
    /// Append every page of `source` to the end of this document
    ///
    /// Pages keep their source order. Objects shared between the copied pages
    /// (fonts, images) are copied once.
    ///
    /// Only objects already written into `source` are copied, so a document
    /// with images inserted since its last [`PdfDocument::to_bytes`] should be
    /// re-opened from those bytes first.
    ///
    /// # Returns
    /// Number of pages appended
    pub fn append_pages_from(&mut self, source: &PdfDocument) -> Result<usize> {
        let page_count = source.page_count();
        let mut copier = ObjectCopier::new(&source.inner);

        for page in 1..=page_count {
            self.import_page(&mut copier, source, page)?;
        }

        Ok(page_count)
    }

    /// Append a single page (1-indexed) of `source` to the end of this document
    ///
    /// # Returns
    /// New page number (1-indexed) in this document
    pub fn append_page_from(&mut self, source: &PdfDocument, page: usize) -> Result<usize> {
        let mut copier = ObjectCopier::new(&source.inner);
        self.import_page(&mut copier, source, page)
    }

    fn import_page(
        &mut self,
        copier: &mut ObjectCopier<'_>,
        source: &PdfDocument,
        page: usize,
    ) -> Result<usize> {
        let page_count = source.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        let source_page_id = source.page_id(page)?;
        let mut page_dict = source
            .inner
            .get_object(source_page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();

        // The copy hangs directly off our root, so inherited values must be made explicit
        for key in INHERITABLE_ATTRIBUTES {
            if !page_dict.has(key) {
                if let Some(value) = inherited_attribute(&source.inner, source_page_id, key) {
                    page_dict.set(key, value);
                }
            }
        }
        page_dict.remove(b"Parent");

        let mut new_page = copier.copy_dict(&mut self.inner, &page_dict);

        let pages_id = self.pages_root_id()?;
        new_page.set(b"Parent", Object::Reference(pages_id));
        new_page.set(b"Type", Object::Name(b"Page".to_vec()));

        let new_page_id = self.inner.add_object(new_page);
        self.push_page_ref(new_page_id)?;

        Ok(self.page_count())
    }
}

/// Deep-copies objects reachable from a page into another document,
/// assigning fresh object IDs in the target.
struct ObjectCopier<'a> {
    source: &'a Document,
    /// Source object ID -> target object ID
    mapped: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            mapped: HashMap::new(),
        }
    }

    fn copy_dict(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.copy_value(target, value));
        }
        copy
    }

    fn copy_value(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => match self.copy_reference(target, *id) {
                Some(new_id) => Object::Reference(new_id),
                None => Object::Null,
            },
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_value(target, item))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(target, dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dict(target, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    /// Copy an indirect object, returning its ID in the target
    ///
    /// References into the page tree or catalog (annotation /P links, other
    /// pages) are not followed and come back as `None`, as do dangling ones.
    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Option<ObjectId> {
        if let Some(new_id) = self.mapped.get(&id) {
            return Some(*new_id);
        }

        let source = self.source;
        let object = source.get_object(id).ok()?;
        if matches!(object.type_name(), Ok("Page" | "Pages" | "Catalog")) {
            return None;
        }

        // Reserve the ID before recursing so cycles resolve to it
        let new_id = target.new_object_id();
        self.mapped.insert(id, new_id);

        let copy = self.copy_value(target, object);
        target.objects.insert(new_id, copy);

        Some(new_id)
    }
}
