//! Request to invitation pipeline

use crate::assembler::{Assembler, GeneratedDocumentSpec, PageItem};
use crate::config::{InvitationConfig, InvitationKind};
use crate::source::AssetSource;
use crate::{InviteError, Result};
use text_fit::{rasterize_with, FontBook, RasterResult};
use tracing::{debug, info};

const FALLBACK_FILENAME: &str = "Generated";

/// A validated generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationRequest {
    name: String,
    kind: InvitationKind,
}

impl InvitationRequest {
    /// Fails with [`InviteError::Validation`] when `name` is empty
    pub fn new(name: impl Into<String>, kind: InvitationKind) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(InviteError::Validation("name must not be empty".into()));
        }
        Ok(Self { name, kind })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InvitationKind {
        self.kind
    }
}

/// A finished invitation
#[derive(Debug, Clone)]
pub struct Invitation {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// The raster drawn for each layer, in layer order
    pub layers: Vec<RasterResult>,
}

/// Output filename for a name
///
/// The trimmed name with path separators and control characters replaced by
/// `_`, or `Generated` when nothing is left.
pub fn suggested_filename(name: &str) -> String {
    let trimmed = name.trim();
    let stem: String = if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed
            .chars()
            .map(|c| match c {
                '/' | '\\' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect()
    };
    format!("{stem}.pdf")
}

/// Renders names onto one invitation variant
pub struct InvitationGenerator<S> {
    config: InvitationConfig,
    fonts: FontBook,
    source: S,
}

impl<S: AssetSource> InvitationGenerator<S> {
    /// Fails when the configuration is invalid or a layer names an
    /// unregistered font family
    pub fn new(config: InvitationConfig, fonts: FontBook, source: S) -> Result<Self> {
        config.validate()?;

        for (index, layer) in config.layers.iter().enumerate() {
            if !fonts.contains(&layer.text.font_family) {
                return Err(InviteError::Config(format!(
                    "layer {} uses unknown font family '{}'",
                    index + 1,
                    layer.text.font_family
                )));
            }
        }

        Ok(Self {
            config,
            fonts,
            source,
        })
    }

    pub fn config(&self) -> &InvitationConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Rasterize `text` once per layer, without any transform
    pub fn render_layers(&self, text: &str) -> Result<Vec<RasterResult>> {
        self.config
            .layers
            .iter()
            .map(|layer| Ok(rasterize_with(&self.fonts, text, &layer.text)?))
            .collect()
    }

    pub async fn generate(&self, request: &InvitationRequest) -> Result<Invitation> {
        let text = self.config.transform.apply(request.name().trim());
        info!(kind = ?request.kind(), "Generating invitation");

        let layers = self.render_layers(&text)?;
        let mut spec = GeneratedDocumentSpec::new(self.config.page_size());

        for (layer, raster) in self.config.layers.iter().zip(&layers) {
            debug!(
                font_size = raster.layout.font_size,
                lines = raster.layout.lines.len(),
                "Rendered layer"
            );
            spec.push_page(PageItem::from_raster(raster, layer.position, false));
            spec.backgrounds.push(self.load_background(layer.background.as_deref()).await?);
        }

        let fragments = self.config.fragments.sequence(request.kind());
        let bytes = Assembler::new(&self.source)
            .assemble(&spec, &fragments)
            .await?;

        Ok(Invitation {
            bytes,
            filename: suggested_filename(request.name()),
            layers,
        })
    }

    async fn load_background(&self, reference: Option<&str>) -> Result<Option<Vec<u8>>> {
        let Some(reference) = reference else {
            return Ok(None);
        };

        let bytes = self
            .source
            .fetch(reference)
            .await
            .map_err(|source| InviteError::Background {
                reference: reference.to_string(),
                source,
            })?;
        Ok(Some(bytes))
    }
}
