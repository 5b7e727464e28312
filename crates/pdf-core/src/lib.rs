//! PDF Core - Low-level PDF page building and merging
//!
//! This crate provides functionality for:
//! - Creating documents with fixed-size blank pages
//! - Opening and saving PDF documents from bytes
//! - Inserting images (JPEG, PNG with alpha) at absolute positions
//! - Copying pages between documents while preserving order
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{PageSize, PdfDocument};
//!
//! let mut doc = PdfDocument::new();
//! let page = doc.add_blank_page(PageSize::new(461.0, 670.0))?;
//! doc.insert_image(&background_png, page, 0.0, 0.0, 461.0, 670.0)?;
//!
//! let mut merged = PdfDocument::new();
//! merged.append_pages_from(&PdfDocument::open_from_bytes(&cover_pdf)?)?;
//! merged.append_page_from(&doc, 1)?;
//! let bytes = merged.to_bytes()?;
//! ```

mod document;
mod image;
mod merge;

pub use document::PdfDocument;
pub use crate::image::ImageFormat;

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A4 portrait (595.28 x 841.89 points)
    pub fn a4() -> Self {
        Self::new(595.28, 841.89)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::a4()
    }
}
