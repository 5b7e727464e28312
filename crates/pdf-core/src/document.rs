//! PDF Document wrapper

use crate::image::{generate_image_operators, ImageXObject};
use crate::{PageSize, PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Guard against malformed page trees with cyclic Parent links
const MAX_TREE_DEPTH: usize = 32;

/// PDF Document wrapper providing high-level operations
pub struct PdfDocument {
    /// The underlying lopdf document
    pub(crate) inner: Document,
    /// Embedded images (data hash -> PDF object ID)
    embedded_images: HashMap<u64, ObjectId>,
    /// Page image resources (page number -> image name -> object ID)
    page_image_resources: HashMap<usize, HashMap<String, ObjectId>>,
    /// Next image resource number
    next_image_resource: u32,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: HashMap<usize, Vec<u8>>,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    /// Create an empty document with no pages
    pub fn new() -> Self {
        let mut inner = Document::with_version("1.5");

        let pages_id = inner.new_object_id();
        let mut pages_dict = Dictionary::new();
        pages_dict.set(b"Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set(b"Kids", Object::Array(vec![]));
        pages_dict.set(b"Count", Object::Integer(0));
        inner.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set(b"Type", Object::Name(b"Catalog".to_vec()));
        catalog.set(b"Pages", Object::Reference(pages_id));
        let catalog_id = inner.add_object(catalog);

        inner.trailer.set(b"Root", Object::Reference(catalog_id));

        Self::from_inner(inner)
    }

    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_inner(inner))
    }

    fn from_inner(inner: Document) -> Self {
        Self {
            inner,
            embedded_images: HashMap::new(),
            page_image_resources: HashMap::new(),
            next_image_resource: 1,
            page_content_buffer: HashMap::new(),
        }
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Add a blank page with the given MediaBox size
    ///
    /// # Returns
    /// New page number (1-indexed)
    ///
    /// # Example
    /// ```ignore
    /// let mut doc = PdfDocument::new();
    /// let page = doc.add_blank_page(PageSize::new(461.0, 670.0))?;
    /// assert_eq!(page, 1);
    /// ```
    pub fn add_blank_page(&mut self, size: PageSize) -> Result<usize> {
        let contents_id = self
            .inner
            .add_object(Object::Stream(Stream::new(Dictionary::new(), vec![])));

        let pages_id = self.pages_root_id()?;

        let mut page_dict = Dictionary::new();
        page_dict.set(b"Type", Object::Name(b"Page".to_vec()));
        page_dict.set(b"Parent", Object::Reference(pages_id));
        page_dict.set(
            b"MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.width as f32),
                Object::Real(size.height as f32),
            ]),
        );
        page_dict.set(b"Resources", Object::Dictionary(Dictionary::new()));
        page_dict.set(b"Contents", Object::Reference(contents_id));

        let new_page_id = self.inner.add_object(Object::Dictionary(page_dict));
        self.push_page_ref(new_page_id)?;

        Ok(self.page_count())
    }

    /// Insert an image at a specific position
    ///
    /// The image is stretched to exactly `width` x `height` points.
    ///
    /// # Arguments
    /// * `data` - Image file bytes (JPEG or PNG)
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points
    /// * `y` - Y coordinate in points (from top)
    /// * `width` - Image width in points
    /// * `height` - Image height in points
    pub fn insert_image(
        &mut self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        let image_resource_name = self.get_or_create_image_ref(data, page)?;

        // Convert Y coordinate from top-origin to PDF bottom-origin
        let page_height = self.page_size(page)?.height;
        let pdf_y = page_height - y - height;

        let operators = generate_image_operators(&image_resource_name, x, pdf_y, width, height);

        // Buffer content operators (will be flushed at save time)
        self.buffer_content(page, &operators);

        Ok(())
    }

    /// Get page dimensions in points
    ///
    /// Reads MediaBox (or CropBox), following the parent chain when the
    /// attribute is inherited. Pages without either are treated as A4.
    pub fn page_size(&self, page: usize) -> Result<PageSize> {
        let page_id = self.page_id(page)?;

        let media_box = match inherited_attribute(&self.inner, page_id, b"MediaBox")
            .or_else(|| inherited_attribute(&self.inner, page_id, b"CropBox"))
        {
            Some(media_box) => media_box,
            None => return Ok(PageSize::a4()),
        };

        let media_box = match media_box {
            Object::Reference(ref_id) => self.inner.get_object(ref_id)?.clone(),
            other => other,
        };
        let values = media_box
            .as_array()
            .map_err(|_| PdfError::ParseError("MediaBox is not an array".to_string()))?;

        if values.len() < 4 {
            return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
        }

        let coord = |index: usize| {
            number(&values[index])
                .ok_or_else(|| PdfError::ParseError(format!("Invalid MediaBox entry {index}")))
        };
        let (x1, y1, x2, y2) = (coord(0)?, coord(1)?, coord(2)?, coord(3)?);

        Ok(PageSize::new((x2 - x1).abs(), (y2 - y1).abs()))
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffers()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Object ID of a 1-indexed page
    pub(crate) fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Object ID of the root Pages node
    pub(crate) fn pages_root_id(&self) -> Result<ObjectId> {
        let catalog_id = self
            .inner
            .trailer
            .get(b"Root")
            .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))?
            .as_reference()
            .map_err(|_| PdfError::ParseError("Root is not a reference".to_string()))?;

        self.inner
            .get_object(catalog_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?
            .get(b"Pages")
            .map_err(|_| PdfError::ParseError("Catalog missing Pages entry".to_string()))?
            .as_reference()
            .map_err(|_| PdfError::ParseError("Pages is not a reference".to_string()))
    }

    /// Append a page object to the end of the root Kids array
    pub(crate) fn push_page_ref(&mut self, page_id: ObjectId) -> Result<()> {
        let pages_id = self.pages_root_id()?;

        let pages_dict = self
            .inner
            .get_object(pages_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Pages object is not a dictionary".to_string()))?;

        let mut kids_array = pages_dict
            .get(b"Kids")
            .map_err(|_| PdfError::ParseError("Pages object missing Kids array".to_string()))?
            .as_array()
            .map_err(|_| PdfError::ParseError("Kids is not an array".to_string()))?
            .clone();
        kids_array.push(Object::Reference(page_id));

        let current_count = pages_dict
            .get(b"Count")
            .map_err(|_| PdfError::ParseError("Pages object missing Count".to_string()))?
            .as_i64()
            .map_err(|_| PdfError::ParseError("Count is not an integer".to_string()))?;

        let mut new_pages_dict = pages_dict.clone();
        new_pages_dict.set(b"Kids", Object::Array(kids_array));
        new_pages_dict.set(b"Count", Object::Integer(current_count + 1));

        self.inner.objects.insert(pages_id, new_pages_dict.into());

        Ok(())
    }

    /// Buffer content operators for a page (written at save time)
    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Flush all buffered content to page streams
    ///
    /// Each page gets exactly one new stream object, however many images were drawn on it.
    fn flush_content_buffers(&mut self) -> Result<()> {
        let buffers: Vec<(usize, Vec<u8>)> = self.page_content_buffer.drain().collect();

        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page, &content)?;
            }
        }

        Ok(())
    }

    /// Append content to a page's content stream
    fn append_to_content_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;

        let page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();

        let mut new_content = match page_dict.get(b"Contents") {
            Ok(Object::Array(parts)) => {
                let mut combined = Vec::new();
                for part in parts {
                    combined.extend_from_slice(&self.stream_content(part));
                }
                combined
            }
            Ok(contents) => self.stream_content(contents),
            Err(_) => Vec::new(),
        };
        new_content.extend_from_slice(content);

        let stream_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), new_content));

        let mut new_page_dict = page_dict;
        new_page_dict.set(b"Contents", Object::Reference(stream_id));
        self.inner.objects.insert(page_id, new_page_dict.into());

        Ok(())
    }

    /// Decompressed bytes of a stream object or a reference to one
    fn stream_content(&self, object: &Object) -> Vec<u8> {
        let stream = match object {
            Object::Stream(stream) => stream,
            Object::Reference(ref_id) => match self.inner.get_object(*ref_id) {
                Ok(Object::Stream(stream)) => stream,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };

        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())
    }

    /// Get or create an image reference for a specific page
    ///
    /// Returns the resource name (e.g., "Im1", "Im2").
    /// Images are deduplicated by hash of their data.
    fn get_or_create_image_ref(&mut self, data: &[u8], page: usize) -> Result<String> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let data_hash = hasher.finish();

        let object_id = match self.embedded_images.get(&data_hash).copied() {
            Some(id) => id,
            None => {
                let xobject = ImageXObject::from_bytes(data).map_err(|e| {
                    PdfError::ImageError(format!("Failed to create image XObject: {e}"))
                })?;

                let soft_mask_id = xobject
                    .soft_mask_stream()
                    .map(|mask| self.inner.add_object(mask));
                let object_id = self.inner.add_object(xobject.to_pdf_stream(soft_mask_id));

                self.embedded_images.insert(data_hash, object_id);
                object_id
            }
        };

        let page_resources = self.page_image_resources.entry(page).or_default();
        if let Some((name, _)) = page_resources.iter().find(|(_, id)| **id == object_id) {
            return Ok(name.clone());
        }

        let resource_name = format!("Im{}", self.next_image_resource);
        self.next_image_resource += 1;
        page_resources.insert(resource_name.clone(), object_id);

        self.add_image_to_page_resources(page, &resource_name, object_id)?;

        Ok(resource_name)
    }

    /// Add image to a specific page's Resources dictionary
    fn add_image_to_page_resources(
        &mut self,
        page: usize,
        resource_name: &str,
        object_id: ObjectId,
    ) -> Result<()> {
        let page_id = self.page_id(page)?;

        let page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::SaveError("Page object is not a dictionary".to_string()))?
            .clone();

        let mut resources = page_dict
            .get(b"Resources")
            .ok()
            .and_then(|resources| self.resolve_dict(resources))
            .unwrap_or_default();

        let mut xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|xobject| self.resolve_dict(xobject))
            .unwrap_or_default();

        xobjects.set(resource_name.as_bytes(), Object::Reference(object_id));
        resources.set(b"XObject", Object::Dictionary(xobjects));

        let mut new_page_dict = page_dict;
        new_page_dict.set(b"Resources", Object::Dictionary(resources));
        self.inner.objects.insert(page_id, new_page_dict.into());

        Ok(())
    }

    /// Clone a dictionary that is either inline or behind a reference
    fn resolve_dict(&self, object: &Object) -> Option<Dictionary> {
        match object {
            Object::Dictionary(dict) => Some(dict.clone()),
            Object::Reference(ref_id) => self
                .inner
                .get_object(*ref_id)
                .ok()
                .and_then(|obj| obj.as_dict().ok())
                .cloned(),
            _ => None,
        }
    }
}

/// Look up a page attribute on the page or its nearest ancestor Pages node
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current_id = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(current_id).ok()?.as_dict().ok()?;

        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current_id = *parent_id,
            _ => return None,
        }
    }

    None
}

fn number(object: &Object) -> Option<f64> {
    object
        .as_f32()
        .map(|v| v as f64)
        .ok()
        .or_else(|| object.as_i64().ok().map(|v| v as f64))
}
