//! Drawing a layout onto a transparent canvas and encoding it

use crate::face::{FontBook, Typeface};
use crate::fit::{layout_text, TextLayout};
use crate::layout::LayoutParams;
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Encoded raster of one rendered text block
#[derive(Debug, Clone)]
pub struct RasterResult {
    /// PNG-encoded RGBA image
    pub png: Vec<u8>,
    /// Pixel width, always the layout's `canvasWidth`
    pub width: u32,
    /// Pixel height, always the layout's `canvasHeight`
    pub height: u32,
    pub layout: TextLayout,
}

impl RasterResult {
    /// `data:image/png;base64,...` form of the image
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Rasterize `text` with an explicit typeface
///
/// Lines are drawn with their em box top at the line's `y`. Text running past
/// the bottom of the canvas is clipped and only logged.
pub fn rasterize(face: &dyn Typeface, text: &str, params: &LayoutParams) -> Result<RasterResult> {
    let layout = layout_text(face, text, params)?;
    let mut canvas = RgbaImage::new(params.canvas_width, params.canvas_height);

    let ascent = face.ascent(layout.font_size);
    for line in layout.lines.iter().filter(|line| !line.text.is_empty()) {
        let width = face.text_width(&line.text, layout.font_size);
        let x = layout.line_origin(width);
        face.draw(
            &mut canvas,
            &line.text,
            x,
            line.y + ascent,
            layout.font_size,
            params.color,
        );
    }

    if layout.overflows(params.canvas_height) {
        tracing::warn!(
            lines = layout.lines.len(),
            canvas_height = params.canvas_height,
            "Text extends past the canvas and will be clipped"
        );
    }

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(RasterResult {
        png,
        width: params.canvas_width,
        height: params.canvas_height,
        layout,
    })
}

/// Rasterize `text` with the face `params` selects from `fonts`
pub fn rasterize_with(fonts: &FontBook, text: &str, params: &LayoutParams) -> Result<RasterResult> {
    let face = fonts.face(&params.font_family, &params.font_weight)?;
    rasterize(face, text, params)
}
