//! Invitation configuration
//!
//! One JSON document describes a complete invitation variant. Relative font
//! and asset paths are resolved against the directory of the configuration
//! file.

use crate::assembler::{Position, StaticFragment};
use crate::{InviteError, Result};
use pdf_core::PageSize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use text_fit::{FontBook, FontFamilyBuilder, LayoutParams};
use tracing::debug;

/// Merge order leaves room for exactly this many generated pages
pub const MAX_LAYERS: usize = 2;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Selects the middle fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvitationKind {
    #[default]
    Couple,
    FullFamily,
}

impl FromStr for InvitationKind {
    type Err = InviteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "couple" => Ok(InvitationKind::Couple),
            "fullFamily" | "full-family" | "full_family" => Ok(InvitationKind::FullFamily),
            other => Err(InviteError::Validation(format!(
                "unknown invitation kind '{other}'"
            ))),
        }
    }
}

/// Page size in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

impl From<PageDimensions> for PageSize {
    fn from(dims: PageDimensions) -> Self {
        PageSize::new(dims.width, dims.height)
    }
}

/// A font family loaded from files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDef {
    /// Referenced by `fontFamily` in layer layouts
    pub id: String,
    pub regular: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<PathBuf>,
}

/// One name-bearing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameLayer {
    /// Image painted across the whole page beneath the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    pub position: Position,
    pub text: LayoutParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddleFragments {
    pub couple: String,
    pub full_family: String,
}

/// References of the three static fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentSet {
    pub opening: String,
    pub middle: MiddleFragments,
    pub closing: String,
}

impl FragmentSet {
    /// The fragments in merge order for an invitation kind
    pub fn sequence(&self, kind: InvitationKind) -> [StaticFragment; 3] {
        let middle = match kind {
            InvitationKind::Couple => &self.middle.couple,
            InvitationKind::FullFamily => &self.middle.full_family,
        };

        [
            StaticFragment::new(self.opening.as_str()),
            StaticFragment::new(middle.as_str()),
            StaticFragment::new(self.closing.as_str()),
        ]
    }

    fn references(&self) -> [(&'static str, &str); 4] {
        [
            ("opening", &self.opening),
            ("middle.couple", &self.middle.couple),
            ("middle.fullFamily", &self.middle.full_family),
            ("closing", &self.closing),
        ]
    }
}

/// Rewrite applied to the trimmed name before rasterizing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NameTransform {
    #[default]
    None,
    /// Append a suffix, e.g. a trailing separator
    Append(String),
}

impl NameTransform {
    pub fn apply(&self, name: &str) -> String {
        match self {
            NameTransform::None => name.to_string(),
            NameTransform::Append(suffix) => format!("{name}{suffix}"),
        }
    }
}

/// A complete invitation variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationConfig {
    pub page_size: PageDimensions,
    #[serde(default)]
    pub fonts: Vec<FontDef>,
    pub layers: Vec<NameLayer>,
    pub fragments: FragmentSet,
    #[serde(default)]
    pub transform: NameTransform,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl InvitationConfig {
    /// Parse a configuration; relative paths resolve against the working directory
    pub fn from_json(json: &str) -> Result<Self> {
        let config: InvitationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file; relative paths resolve against its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            InviteError::Config(format!("cannot read {}: {e}", path.display()))
        })?;

        let mut config = Self::from_json(&json)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        debug!(path = %path.display(), layers = config.layers.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size.into()
    }

    pub fn validate(&self) -> Result<()> {
        let PageDimensions { width, height } = self.page_size;
        if width <= 0.0 || height <= 0.0 {
            return Err(InviteError::Config(format!(
                "page size must be positive, got {width}x{height}"
            )));
        }

        if self.layers.is_empty() || self.layers.len() > MAX_LAYERS {
            return Err(InviteError::Config(format!(
                "expected 1 to {MAX_LAYERS} layers, got {}",
                self.layers.len()
            )));
        }

        for (index, layer) in self.layers.iter().enumerate() {
            layer
                .text
                .validate()
                .map_err(|e| InviteError::Config(format!("layer {}: {e}", index + 1)))?;
        }

        for (name, reference) in self.fragments.references() {
            if reference.trim().is_empty() {
                return Err(InviteError::Config(format!("fragment {name} is empty")));
            }
        }

        if self.fetch_timeout_secs == 0 {
            return Err(InviteError::Config("fetchTimeoutSecs must be positive".into()));
        }

        Ok(())
    }

    /// Load every configured font family from disk
    pub fn load_fonts(&self) -> Result<FontBook> {
        let mut fonts = FontBook::new();

        for def in &self.fonts {
            let mut builder = FontFamilyBuilder::new().regular(self.read_font(&def.regular)?);
            if let Some(bold) = &def.bold {
                builder = builder.bold(self.read_font(bold)?);
            }

            fonts.register(def.id.clone(), builder.build()?);
            debug!(id = %def.id, bold = def.bold.is_some(), "Registered font family");
        }

        Ok(fonts)
    }

    fn read_font(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.base_dir.join(path);
        std::fs::read(&path)
            .map_err(|e| InviteError::Config(format!("cannot read font {}: {e}", path.display())))
    }
}
