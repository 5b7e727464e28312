//! Layout parameters for a single rasterization

use crate::{RasterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Right-margin convention used when word-wrapping
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapMargin {
    /// Lines may use `canvasWidth - 2 * paddingX`
    #[default]
    Padding,
    /// Lines may use `canvasWidth - m`
    Fixed(f32),
}

/// RGB text color, written as `#rrggbb` or `#rgb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a CSS hex color
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || RasterError::InvalidLayout(format!("Invalid color: {hex}"));

        if !digits.is_ascii() {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match digits.len() {
            6 => Ok(Self::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                // #abc expands to #aabbcc
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Ok(Self::rgb(r * 17, g * 17, b * 17))
            }
            _ => Err(invalid()),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0xb4, 0x00, 0x00)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = RasterError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Parameters for one rasterization call
///
/// Pixel units throughout. Font sizes are em sizes, the way a CSS `px` size is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutParams {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub font_size: f32,
    pub min_font_size: f32,
    /// `normal`, `bold`, or a numeric weight `100`..`900`
    pub font_weight: String,
    pub color: Color,
    /// Id of a family registered in the [`FontBook`](crate::FontBook)
    pub font_family: String,
    pub text_align: TextAlign,
    pub padding_x: f32,
    pub padding_y: f32,
    /// Distance between line tops; `fontSize + 10` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    /// Enables the shrink-to-fit loop
    pub allow_resize: bool,
    pub wrap_margin: WrapMargin,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            canvas_width: 300,
            canvas_height: 50,
            font_size: 15.0,
            min_font_size: 15.0,
            font_weight: "700".to_string(),
            color: Color::default(),
            font_family: "default".to_string(),
            text_align: TextAlign::Left,
            padding_x: 10.0,
            padding_y: 40.0,
            line_height: None,
            allow_resize: true,
            wrap_margin: WrapMargin::Padding,
        }
    }
}

impl LayoutParams {
    /// Check the parameters describe a drawable layout
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(RasterError::InvalidLayout(msg.to_string()));

        if self.canvas_width == 0 || self.canvas_height == 0 {
            return invalid("canvas dimensions must be positive");
        }
        if self.font_size <= 0.0 || self.min_font_size <= 0.0 {
            return invalid("font sizes must be positive");
        }
        if self.min_font_size > self.font_size {
            return invalid("minFontSize must not exceed fontSize");
        }
        if self.padding_x < 0.0 || self.padding_y < 0.0 {
            return invalid("paddings must not be negative");
        }
        if self.padding_x * 2.0 >= self.canvas_width as f32 {
            return invalid("paddingX * 2 must be smaller than canvasWidth");
        }
        if let Some(line_height) = self.line_height {
            if line_height <= 0.0 {
                return invalid("lineHeight must be positive");
            }
        }
        if let WrapMargin::Fixed(margin) = self.wrap_margin {
            if margin < 0.0 || margin >= self.canvas_width as f32 {
                return invalid("fixed wrap margin must be within the canvas width");
            }
        }

        Ok(())
    }

    /// Width the whole string must fit in for the shrink loop
    pub fn fit_width(&self) -> f32 {
        self.canvas_width as f32 - self.padding_x * 2.0
    }

    /// Widest a wrapped line may measure
    pub fn wrap_threshold(&self) -> f32 {
        match self.wrap_margin {
            WrapMargin::Padding => self.fit_width(),
            WrapMargin::Fixed(margin) => self.canvas_width as f32 - margin,
        }
    }

    /// Distance between consecutive line tops at `font_size`
    pub fn resolved_line_height(&self, font_size: f32) -> f32 {
        self.line_height.unwrap_or(font_size + 10.0)
    }

    /// Horizontal reference point the alignment mode draws from
    pub fn anchor_x(&self) -> f32 {
        match self.text_align {
            TextAlign::Left => self.padding_x,
            TextAlign::Center => self.canvas_width as f32 / 2.0,
            TextAlign::Right => self.canvas_width as f32 - self.padding_x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let params = LayoutParams::default();
        assert_eq!(params.canvas_width, 300);
        assert_eq!(params.canvas_height, 50);
        assert_eq!(params.font_weight, "700");
        assert_eq!(params.color, Color::rgb(0xb4, 0, 0));
        assert_eq!(params.padding_y, 40.0);
        assert!(params.allow_resize);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::from_hex("#e50780").unwrap(), Color::rgb(0xe5, 0x07, 0x80));
        assert_eq!(Color::from_hex("fff").unwrap(), Color::rgb(255, 255, 255));
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
        assert_eq!(Color::rgb(0x86, 0x0b, 0x0c).to_string(), "#860b0c");
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let params: LayoutParams = serde_json::from_str(
            r##"{
                "canvasWidth": 310,
                "canvasHeight": 240,
                "fontWeight": "600",
                "color": "#e50780",
                "paddingX": 0,
                "paddingY": 20,
                "lineHeight": 24,
                "allowResize": false,
                "textAlign": "center"
            }"##,
        )
        .unwrap();

        assert_eq!(params.canvas_width, 310);
        assert_eq!(params.font_size, 15.0);
        assert_eq!(params.color, Color::rgb(0xe5, 0x07, 0x80));
        assert_eq!(params.line_height, Some(24.0));
        assert_eq!(params.text_align, TextAlign::Center);
        assert_eq!(params.wrap_margin, WrapMargin::Padding);
        assert!(!params.allow_resize);
    }

    #[test]
    fn test_deserialize_wrap_margin() {
        let padding: WrapMargin = serde_json::from_str(r#""padding""#).unwrap();
        assert_eq!(padding, WrapMargin::Padding);

        let fixed: WrapMargin = serde_json::from_str(r#"{ "fixed": 20 }"#).unwrap();
        assert_eq!(fixed, WrapMargin::Fixed(20.0));
    }

    #[test]
    fn test_bad_color_fails_deserialization() {
        let result: std::result::Result<LayoutParams, _> =
            serde_json::from_str(r#"{ "color": "red" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejections() {
        let base = LayoutParams::default();

        let cases = [
            LayoutParams { canvas_width: 0, ..base.clone() },
            LayoutParams { canvas_height: 0, ..base.clone() },
            LayoutParams { font_size: 0.0, ..base.clone() },
            LayoutParams { min_font_size: 20.0, ..base.clone() },
            LayoutParams { padding_y: -1.0, ..base.clone() },
            LayoutParams { padding_x: 150.0, ..base.clone() },
            LayoutParams { line_height: Some(0.0), ..base.clone() },
            LayoutParams { wrap_margin: WrapMargin::Fixed(300.0), ..base.clone() },
            LayoutParams { wrap_margin: WrapMargin::Fixed(-1.0), ..base.clone() },
        ];

        for params in cases {
            assert!(
                matches!(params.validate(), Err(RasterError::InvalidLayout(_))),
                "{params:?}"
            );
        }
    }

    #[test]
    fn test_thresholds_and_anchor() {
        let mut params = LayoutParams {
            canvas_width: 310,
            padding_x: 5.0,
            ..Default::default()
        };
        assert_eq!(params.fit_width(), 300.0);
        assert_eq!(params.wrap_threshold(), 300.0);

        params.wrap_margin = WrapMargin::Fixed(20.0);
        assert_eq!(params.fit_width(), 300.0);
        assert_eq!(params.wrap_threshold(), 290.0);

        assert_eq!(params.anchor_x(), 5.0);
        params.text_align = TextAlign::Center;
        assert_eq!(params.anchor_x(), 155.0);
        params.text_align = TextAlign::Right;
        assert_eq!(params.anchor_x(), 305.0);
    }

    #[test]
    fn test_line_height_resolution() {
        let mut params = LayoutParams::default();
        assert_eq!(params.resolved_line_height(13.0), 23.0);
        params.line_height = Some(34.0);
        assert_eq!(params.resolved_line_height(13.0), 34.0);
    }
}
