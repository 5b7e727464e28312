//! Text Fit - fixed-size text rasterization
//!
//! Renders a string into a `canvasWidth x canvasHeight` image in two phases:
//! the whole string is first shrunk until it fits the padded width (bounded by
//! `minFontSize`), then it is greedily word-wrapped at the chosen size and the
//! lines are stacked from `paddingY` downward.
//!
//! # Example
//!
//! ```ignore
//! use text_fit::{FontBook, FontFamilyBuilder, LayoutParams};
//!
//! let mut fonts = FontBook::new();
//! fonts.register(
//!     "serif",
//!     FontFamilyBuilder::new()
//!         .regular(std::fs::read("fonts/Serif-Regular.ttf")?)
//!         .bold(std::fs::read("fonts/Serif-Bold.ttf")?)
//!         .build()?,
//! );
//!
//! let params = LayoutParams { font_family: "serif".into(), ..Default::default() };
//! let raster = text_fit::rasterize_with(&fonts, "Alice", &params)?;
//! std::fs::write("name.png", &raster.png)?;
//! ```

pub mod face;
pub mod fit;
pub mod layout;
pub mod raster;

pub use face::{FontBook, FontFamily, FontFamilyBuilder, FontWeight, GlyphFace, Typeface};
pub use fit::{fit_font_size, layout_text, wrap_words, LayoutLine, TextLayout};
pub use layout::{Color, LayoutParams, TextAlign, WrapMargin};
pub use raster::{rasterize, rasterize_with, RasterResult};

#[cfg(any(test, feature = "test-utils"))]
pub use face::BlockFace;

use thiserror::Error;

/// Errors that can occur while laying out or rasterizing text
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font parse error: {0}")]
    FontParse(String),

    #[error("Image encoding error: {0}")]
    Encode(String),
}

impl From<image::ImageError> for RasterError {
    fn from(err: image::ImageError) -> Self {
        RasterError::Encode(err.to_string())
    }
}

/// Result type for text rasterization
pub type Result<T> = std::result::Result<T, RasterError>;
