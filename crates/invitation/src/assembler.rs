//! Generated document construction and fragment interleaving
//!
//! The output is always the concatenation
//! `fragment 1, generated page 0, fragment 2, generated page 1, fragment 3`.
//! Fragments are fetched one at a time in that order and the first failure
//! aborts the whole assembly; nothing partially merged is returned.

use crate::source::{AssetSource, FetchError};
use pdf_core::{PageSize, PdfDocument, PdfError};
use serde::{Deserialize, Serialize};
use text_fit::RasterResult;
use thiserror::Error;
use tracing::{debug, info};

/// Reference reported for errors in the intermediate generated document
pub const GENERATED_REFERENCE: &str = "generated";

/// Top-left placement in document points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStage {
    Fetch,
    Decode,
    Merge,
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Failed to fetch {reference}: {source}")]
    Fetch {
        reference: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to decode {reference}: {source}")]
    Decode {
        reference: String,
        #[source]
        source: PdfError,
    },

    #[error("Failed to merge documents: {0}")]
    Merge(#[source] PdfError),
}

impl AssemblyError {
    pub fn stage(&self) -> AssemblyStage {
        match self {
            AssemblyError::Fetch { .. } => AssemblyStage::Fetch,
            AssemblyError::Decode { .. } => AssemblyStage::Decode,
            AssemblyError::Merge(_) => AssemblyStage::Merge,
        }
    }

    /// The fragment reference (or [`GENERATED_REFERENCE`]) that failed
    pub fn reference(&self) -> Option<&str> {
        match self {
            AssemblyError::Fetch { reference, .. } | AssemblyError::Decode { reference, .. } => {
                Some(reference)
            }
            AssemblyError::Merge(_) => None,
        }
    }

    fn generated(source: PdfError) -> Self {
        AssemblyError::Decode {
            reference: GENERATED_REFERENCE.to_string(),
            source,
        }
    }
}

/// One image placed on the generated document
#[derive(Debug, Clone)]
pub struct PageItem {
    /// PNG or JPEG bytes
    pub image: Vec<u8>,
    /// Drawn size in points
    pub width: f64,
    pub height: f64,
    pub position: Position,
    /// Start a new page before this item
    pub page_break_before: bool,
}

impl PageItem {
    /// Place a raster at its intrinsic size, one pixel per point
    pub fn from_raster(raster: &RasterResult, position: Position, page_break_before: bool) -> Self {
        Self {
            image: raster.png.clone(),
            width: raster.width as f64,
            height: raster.height as f64,
            position,
            page_break_before,
        }
    }
}

/// Description of the generated document
///
/// Every page has the same fixed size. Background `i` is painted across the
/// whole of page `i` (0-based) beneath its items.
#[derive(Debug, Clone)]
pub struct GeneratedDocumentSpec {
    pub page_size: PageSize,
    pub items: Vec<PageItem>,
    pub backgrounds: Vec<Option<Vec<u8>>>,
}

impl GeneratedDocumentSpec {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            items: Vec::new(),
            backgrounds: Vec::new(),
        }
    }

    /// Append an item, breaking the page before every item but the first
    pub fn push_page(&mut self, item: PageItem) {
        let page_break_before = !self.items.is_empty();
        self.items.push(PageItem {
            page_break_before,
            ..item
        });
    }

    pub fn background_for(&self, page_index: usize) -> Option<&[u8]> {
        self.backgrounds.get(page_index)?.as_deref()
    }

    /// Number of pages [`render`](Self::render) produces
    pub fn page_count(&self) -> usize {
        self.items
            .iter()
            .enumerate()
            .filter(|(i, item)| *i == 0 || item.page_break_before)
            .count()
    }

    /// Render to PDF bytes
    pub fn render(&self) -> Result<Vec<u8>, PdfError> {
        let mut doc = PdfDocument::new();
        let mut page = 0;

        for (index, item) in self.items.iter().enumerate() {
            if index == 0 || item.page_break_before {
                page = doc.add_blank_page(self.page_size)?;
                if let Some(background) = self.background_for(page - 1) {
                    doc.insert_image(
                        background,
                        page,
                        0.0,
                        0.0,
                        self.page_size.width,
                        self.page_size.height,
                    )?;
                }
            }

            doc.insert_image(
                &item.image,
                page,
                item.position.x,
                item.position.y,
                item.width,
                item.height,
            )?;
        }

        doc.to_bytes()
    }
}

/// An externally stored document merged verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFragment {
    pub reference: String,
}

impl StaticFragment {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// One step of the fixed interleaving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    /// All pages of the fragment at this index
    Fragment(usize),
    /// The generated page at this 0-based index, if it exists
    Generated(usize),
}

pub const MERGE_PLAN: [MergeStep; 5] = [
    MergeStep::Fragment(0),
    MergeStep::Generated(0),
    MergeStep::Fragment(1),
    MergeStep::Generated(1),
    MergeStep::Fragment(2),
];

/// Merges a generated document with three static fragments
pub struct Assembler<'a> {
    source: &'a dyn AssetSource,
}

impl<'a> Assembler<'a> {
    pub fn new(source: &'a dyn AssetSource) -> Self {
        Self { source }
    }

    /// Build the final document following [`MERGE_PLAN`]
    pub async fn assemble(
        &self,
        generated: &GeneratedDocumentSpec,
        fragments: &[StaticFragment; 3],
    ) -> Result<Vec<u8>, AssemblyError> {
        let generated_bytes = generated.render().map_err(AssemblyError::generated)?;
        let generated_doc =
            PdfDocument::open_from_bytes(&generated_bytes).map_err(AssemblyError::generated)?;

        let mut output = PdfDocument::new();

        for step in MERGE_PLAN {
            match step {
                MergeStep::Fragment(index) => {
                    let fragment = &fragments[index];
                    let doc = self.load_fragment(fragment).await?;
                    let appended = output
                        .append_pages_from(&doc)
                        .map_err(AssemblyError::Merge)?;
                    debug!(
                        reference = %fragment.reference,
                        pages = appended,
                        "Appended fragment"
                    );
                }
                MergeStep::Generated(index) => {
                    if index >= generated_doc.page_count() {
                        debug!(index, "Generated page out of range, skipping");
                        continue;
                    }
                    output
                        .append_page_from(&generated_doc, index + 1)
                        .map_err(AssemblyError::Merge)?;
                    debug!(index, "Appended generated page");
                }
            }
        }

        let bytes = output.to_bytes().map_err(AssemblyError::Merge)?;
        info!(
            pages = output.page_count(),
            bytes = bytes.len(),
            "Assembled document"
        );

        Ok(bytes)
    }

    async fn load_fragment(&self, fragment: &StaticFragment) -> Result<PdfDocument, AssemblyError> {
        let bytes = self
            .source
            .fetch(&fragment.reference)
            .await
            .map_err(|source| AssemblyError::Fetch {
                reference: fragment.reference.clone(),
                source,
            })?;

        PdfDocument::open_from_bytes(&bytes).map_err(|source| AssemblyError::Decode {
            reference: fragment.reference.clone(),
            source,
        })
    }
}
