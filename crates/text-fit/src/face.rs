//! Typefaces, font families and glyph drawing

use crate::layout::Color;
use crate::{RasterError, Result};
use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::RgbaImage;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Text measurement and drawing primitive
///
/// Sizes are em sizes in pixels.
pub trait Typeface: Send + Sync {
    /// Advance width of `text` laid out on one line
    fn text_width(&self, text: &str, size: f32) -> f32;

    /// Distance from the top of the em box to the baseline
    fn ascent(&self, size: f32) -> f32;

    /// Draw `text` with its origin at (`x`, `baseline`)
    ///
    /// Coverage outside the canvas is dropped.
    fn draw(&self, canvas: &mut RgbaImage, text: &str, x: f32, baseline: f32, size: f32, color: Color);
}

/// Font weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

impl FontWeight {
    /// Resolve a CSS-style weight token
    ///
    /// Numeric weights of 600 and above count as bold.
    pub fn from_token(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "normal" | "regular" => Ok(FontWeight::Regular),
            "bold" => Ok(FontWeight::Bold),
            other => match other.parse::<u16>() {
                Ok(weight @ 1..=1000) if weight >= 600 => Ok(FontWeight::Bold),
                Ok(1..=1000) => Ok(FontWeight::Regular),
                _ => Err(RasterError::InvalidLayout(format!(
                    "Invalid font weight: {token}"
                ))),
            },
        }
    }
}

/// [`Typeface`] backed by a TrueType/OpenType font
#[derive(Clone)]
pub struct GlyphFace {
    font: FontArc,
}

impl fmt::Debug for GlyphFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphFace")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl GlyphFace {
    /// Parse font file bytes
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font = FontArc::try_from_vec(data).map_err(|e| RasterError::FontParse(e.to_string()))?;
        Ok(Self { font })
    }

    /// ab_glyph scales by line height; convert the em size
    fn scale(&self, size: f32) -> PxScale {
        let units_per_em = self.font.units_per_em().unwrap_or(1000.0);
        PxScale::from(size * self.font.height_unscaled() / units_per_em)
    }
}

impl Typeface for GlyphFace {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(self.scale(size));
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }

        width
    }

    fn ascent(&self, size: f32) -> f32 {
        self.font.as_scaled(self.scale(size)).ascent()
    }

    fn draw(&self, canvas: &mut RgbaImage, text: &str, x: f32, baseline: f32, size: f32, color: Color) {
        let scaled = self.font.as_scaled(self.scale(size));
        let mut caret = x;
        let mut previous: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scaled.scale(), point(caret, baseline));
            caret += scaled.h_advance(id);
            previous = Some(id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let px = bounds.min.x as i64 + gx as i64;
                    let py = bounds.min.y as i64 + gy as i64;
                    blend_pixel(canvas, px, py, color, coverage);
                });
            }
        }
    }
}

/// Composite `color` at `coverage` over the pixel (source-over)
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Color, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }

    let alpha = coverage.clamp(0.0, 1.0);
    if alpha == 0.0 {
        return;
    }

    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    let dst_alpha = pixel[3] as f32 / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);

    let mix = |src: u8, dst: u8| {
        let value = (src as f32 * alpha + dst as f32 * dst_alpha * (1.0 - alpha)) / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    pixel[0] = mix(color.r, pixel[0]);
    pixel[1] = mix(color.g, pixel[1]);
    pixel[2] = mix(color.b, pixel[2]);
    pixel[3] = (out_alpha * 255.0).round() as u8;
}

/// Font family with a regular and an optional bold face
#[derive(Clone)]
pub struct FontFamily {
    regular: Arc<dyn Typeface>,
    bold: Option<Arc<dyn Typeface>>,
}

impl fmt::Debug for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFamily")
            .field("bold", &self.bold.is_some())
            .finish()
    }
}

impl FontFamily {
    /// Family with a single face used for every weight
    pub fn new(regular: impl Typeface + 'static) -> Self {
        Self {
            regular: Arc::new(regular),
            bold: None,
        }
    }

    pub fn with_bold(mut self, bold: impl Typeface + 'static) -> Self {
        self.bold = Some(Arc::new(bold));
        self
    }

    /// Get the face for the specified weight
    /// Falls back to regular if the bold face is not available
    pub fn get_variant(&self, weight: FontWeight) -> &dyn Typeface {
        match weight {
            FontWeight::Bold => self.bold.as_deref().unwrap_or(self.regular.as_ref()),
            FontWeight::Regular => self.regular.as_ref(),
        }
    }

    pub fn has_bold(&self) -> bool {
        self.bold.is_some()
    }
}

/// Builder for font families from font file bytes
#[derive(Default)]
pub struct FontFamilyBuilder {
    regular: Option<Vec<u8>>,
    bold: Option<Vec<u8>>,
}

impl FontFamilyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regular(mut self, ttf_data: Vec<u8>) -> Self {
        self.regular = Some(ttf_data);
        self
    }

    pub fn bold(mut self, ttf_data: Vec<u8>) -> Self {
        self.bold = Some(ttf_data);
        self
    }

    /// Build the FontFamily from the provided font data
    pub fn build(self) -> Result<FontFamily> {
        let regular = match self.regular {
            Some(data) => GlyphFace::from_bytes(data)?,
            None => {
                return Err(RasterError::FontParse(
                    "FontFamily must have at least a regular variant".to_string(),
                ))
            }
        };

        let family = FontFamily::new(regular);
        match self.bold {
            Some(data) => Ok(family.with_bold(GlyphFace::from_bytes(data)?)),
            None => Ok(family),
        }
    }
}

/// Registry of font families by id
#[derive(Debug, Clone, Default)]
pub struct FontBook {
    families: HashMap<String, FontFamily>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family, replacing any family with the same id
    pub fn register(&mut self, id: impl Into<String>, family: FontFamily) {
        self.families.insert(id.into(), family);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.families.contains_key(id)
    }

    /// Resolve a family id and weight token to a face
    pub fn face(&self, family: &str, weight: &str) -> Result<&dyn Typeface> {
        let weight = FontWeight::from_token(weight)?;
        self.families
            .get(family)
            .map(|f| f.get_variant(weight))
            .ok_or_else(|| RasterError::FontNotFound(family.to_string()))
    }
}

/// Deterministic fixed-advance typeface
///
/// Every character advances `0.5 x size`; the ascent is `0.8 x size`.
/// Non-space characters paint a solid cell from the em top to the baseline.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockFace;

#[cfg(any(test, feature = "test-utils"))]
impl BlockFace {
    pub const ADVANCE: f32 = 0.5;
    pub const ASCENT: f32 = 0.8;
}

#[cfg(any(test, feature = "test-utils"))]
impl Typeface for BlockFace {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * Self::ADVANCE
    }

    fn ascent(&self, size: f32) -> f32 {
        size * Self::ASCENT
    }

    fn draw(&self, canvas: &mut RgbaImage, text: &str, x: f32, baseline: f32, size: f32, color: Color) {
        let advance = size * Self::ADVANCE;
        let top = (baseline - self.ascent(size)).round() as i64;
        let bottom = baseline.round() as i64;

        for (index, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let left = (x + index as f32 * advance).round() as i64;
            let right = (x + (index + 1) as f32 * advance).round() as i64;
            for py in top..bottom {
                for px in left..right {
                    blend_pixel(canvas, px, py, color, 1.0);
                }
            }
        }
    }
}
