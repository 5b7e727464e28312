//! Shrink-to-fit and word wrapping

use crate::face::Typeface;
use crate::layout::{LayoutParams, TextAlign};
use crate::Result;

/// A wrapped line and the top of its em box
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub text: String,
    pub y: f32,
}

/// Result of fitting text into a layout
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Font size chosen by the shrink loop
    pub font_size: f32,
    pub line_height: f32,
    /// Horizontal reference point for `align`
    pub anchor_x: f32,
    pub align: TextAlign,
    pub lines: Vec<LayoutLine>,
}

impl TextLayout {
    /// Whether the last line's em box reaches past `canvas_height`
    ///
    /// Such text is clipped when drawn; this is not treated as an error.
    pub fn overflows(&self, canvas_height: u32) -> bool {
        self.lines
            .last()
            .is_some_and(|line| line.y + self.font_size > canvas_height as f32)
    }

    /// Left edge of a line of the given width under this layout's alignment
    pub fn line_origin(&self, line_width: f32) -> f32 {
        match self.align {
            TextAlign::Left => self.anchor_x,
            TextAlign::Center => self.anchor_x - line_width / 2.0,
            TextAlign::Right => self.anchor_x - line_width,
        }
    }
}

/// Shrink `size` one step at a time until the whole, unwrapped string fits
///
/// Returns `params.font_size` untouched when `allow_resize` is off. The
/// result never drops below `params.min_font_size`.
pub fn fit_font_size(face: &dyn Typeface, text: &str, params: &LayoutParams) -> f32 {
    let mut size = params.font_size;
    if !params.allow_resize {
        return size;
    }

    let limit = params.fit_width();
    while face.text_width(text, size) > limit && size > params.min_font_size {
        size = (size - 1.0).max(params.min_font_size);
    }

    size
}

/// Greedily wrap `text` on single spaces
///
/// A line is closed when appending the next token plus a trailing space would
/// measure wider than `threshold`. The closed line is emitted even when it is
/// empty, so a first token wider than the threshold lands on the second line.
/// Such a token is never split. The final line is always emitted, so empty
/// input yields one empty line.
pub fn wrap_words(face: &dyn Typeface, text: &str, size: f32, threshold: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(' ') {
        let candidate = format!("{current}{word} ");
        if face.text_width(&candidate, size) > threshold {
            lines.push(current.trim().to_string());
            current = format!("{word} ");
        } else {
            current = candidate;
        }
    }
    lines.push(current.trim().to_string());

    lines
}

/// Fit, wrap and place `text` according to `params`
pub fn layout_text(face: &dyn Typeface, text: &str, params: &LayoutParams) -> Result<TextLayout> {
    params.validate()?;

    let font_size = fit_font_size(face, text, params);
    let line_height = params.resolved_line_height(font_size);

    let lines: Vec<LayoutLine> = wrap_words(face, text, font_size, params.wrap_threshold())
        .into_iter()
        .enumerate()
        .map(|(i, text)| LayoutLine {
            text,
            y: params.padding_y + i as f32 * line_height,
        })
        .collect();

    tracing::debug!(
        font_size,
        requested = params.font_size,
        lines = lines.len(),
        "Fitted text layout"
    );

    Ok(TextLayout {
        font_size,
        line_height,
        anchor_x: params.anchor_x(),
        align: params.text_align,
        lines,
    })
}
