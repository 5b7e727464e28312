use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use invitation::{
    AssetStore, FileSource, HttpSource, InvitationConfig, InvitationGenerator, InvitationKind,
    InvitationRequest,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Couple,
    FullFamily,
}

impl From<Kind> for InvitationKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Couple => InvitationKind::Couple,
            Kind::FullFamily => InvitationKind::FullFamily,
        }
    }
}

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Render a name onto invitation pages and assemble the PDF")]
struct Args {
    /// Invitation configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Name printed on the invitation
    #[arg(short, long)]
    name: String,

    /// Selects the middle fragment
    #[arg(short, long, value_enum, default_value = "couple")]
    kind: Kind,

    /// Directory the PDF is written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write each layer's rendered name as a PNG into this directory
    #[arg(long)]
    emit_layers: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = InvitationConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let fonts = config.load_fonts().context("loading fonts")?;

    let store = AssetStore::new(
        HttpSource::new(config.fetch_timeout())?,
        FileSource::new(config.base_dir()),
    );
    let generator = InvitationGenerator::new(config, fonts, store)?;

    let request = InvitationRequest::new(args.name, args.kind.into())?;
    let invitation = generator.generate(&request).await?;

    std::fs::create_dir_all(&args.out_dir)?;
    let path = args.out_dir.join(&invitation.filename);
    std::fs::write(&path, &invitation.bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), bytes = invitation.bytes.len(), "Wrote invitation");

    if let Some(dir) = args.emit_layers {
        std::fs::create_dir_all(&dir)?;
        for (index, layer) in invitation.layers.iter().enumerate() {
            let path = dir.join(format!("layer-{}.png", index + 1));
            std::fs::write(&path, &layer.png)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Wrote layer");
        }
    }

    Ok(())
}
