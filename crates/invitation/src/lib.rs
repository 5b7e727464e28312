//! Invitation - name pages interleaved with static PDF fragments
//!
//! A request carries a name and an [`InvitationKind`]. The name is rasterized
//! once per configured layer, each raster is placed on its own page over the
//! layer background, and the resulting two-page document is merged with three
//! static fragments in a fixed order:
//!
//! ```text
//! opening fragment, name page 1, middle fragment, name page 2, closing fragment
//! ```
//!
//! The middle fragment is chosen by the invitation kind.
//!
//! # Example
//!
//! ```ignore
//! use invitation::{AssetStore, FileSource, HttpSource, InvitationConfig};
//! use invitation::{InvitationGenerator, InvitationKind, InvitationRequest};
//!
//! let config = InvitationConfig::from_file("configs/invitation.json")?;
//! let fonts = config.load_fonts()?;
//! let store = AssetStore::new(
//!     HttpSource::new(config.fetch_timeout())?,
//!     FileSource::new(config.base_dir()),
//! );
//!
//! let generator = InvitationGenerator::new(config, fonts, store)?;
//! let request = InvitationRequest::new("Alice & Bob", InvitationKind::Couple)?;
//! let invitation = generator.generate(&request).await?;
//! std::fs::write(&invitation.filename, &invitation.bytes)?;
//! ```

pub mod assembler;
pub mod config;
pub mod generator;
pub mod source;

pub use assembler::{
    Assembler, AssemblyError, AssemblyStage, GeneratedDocumentSpec, MergeStep, PageItem, Position,
    StaticFragment, GENERATED_REFERENCE, MERGE_PLAN,
};
pub use config::{
    FontDef, FragmentSet, InvitationConfig, InvitationKind, MiddleFragments, NameLayer,
    NameTransform, PageDimensions,
};
pub use generator::{suggested_filename, Invitation, InvitationGenerator, InvitationRequest};
pub use source::{AssetSource, AssetStore, FetchError, FileSource, HttpSource, MemorySource};

use text_fit::RasterError;
use thiserror::Error;

/// Errors that can occur while generating an invitation
#[derive(Debug, Error)]
pub enum InviteError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to load background {reference}: {source}")]
    Background {
        reference: String,
        #[source]
        source: FetchError,
    },

    #[error("Render error: {0}")]
    Render(#[from] RasterError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for invitation generation
pub type Result<T> = std::result::Result<T, InviteError>;
