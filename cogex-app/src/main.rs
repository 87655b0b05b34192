mod app;
mod host;
mod present;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cogex_experiment::Timeline;
use cogex_render::{ImageStore, TextRasterizer};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Runs an experiment timeline in a window
#[derive(Parser, Debug)]
#[command(name = "cogex-app", version)]
struct Args {
    /// Timeline JSON file
    timeline: PathBuf,

    /// TrueType/OpenType font for prompts and feedback
    #[arg(long)]
    font: Option<PathBuf>,

    #[arg(long, default_value_t = 32.0)]
    font_size: f32,

    /// Run in a window instead of borderless fullscreen
    #[arg(long)]
    windowed: bool,

    /// Write records here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let timeline = Timeline::load(&args.timeline)
        .with_context(|| format!("loading {}", args.timeline.display()))?;

    let mut images = match &timeline.settings.image_dir {
        Some(dir) => ImageStore::with_base_dir(dir),
        None => ImageStore::new(),
    };
    let loaded = images.preload(timeline.images())?;
    info!(images = loaded, "stimuli preloaded");
    debug!(references = ?images.references(), "image store");

    let text = match &args.font {
        Some(path) => {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Some(
                TextRasterizer::from_bytes(bytes, args.font_size)
                    .with_context(|| format!("parsing font {}", path.display()))?,
            )
        }
        None => None,
    };

    let records = App::new(timeline, images, text, !args.windowed).run()?;
    let json = serde_json::to_string_pretty(&records)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(records = records.len(), path = %path.display(), "results saved");
        }
        None => println!("{json}"),
    }
    Ok(())
}
