//! scoretrack command line.
//!
//! `scoretrack build` converts pages and a note log into a track,
//! `scoretrack inspect` prints a track as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use scoretrack::{pipeline, Inputs, Options};

#[derive(Parser, Debug)]
#[command(name = "scoretrack")]
#[command(about = "Builds score-following playback tracks from engraved pages")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert page SVGs and a note log into a track
    Build {
        /// Note timing log
        #[arg(long)]
        notes: PathBuf,

        /// Staff number to instrument name table
        #[arg(long)]
        instruments: PathBuf,

        /// Page SVG with skyline markers, once per page in page order
        #[arg(long = "page", required = true)]
        pages: Vec<PathBuf>,

        /// Page file to embed instead, once per page in page order
        #[arg(long = "display-page")]
        display_pages: Vec<PathBuf>,

        /// Output track
        #[arg(short, long)]
        output: PathBuf,

        /// TOML file overriding the conversion defaults
        #[arg(short, long, env = "SCORETRACK_CONFIG")]
        config: Option<PathBuf>,

        /// Directory receiving JSON dumps of every stage
        #[arg(long)]
        debug_dump: Option<PathBuf>,
    },
    /// Print a track as JSON
    Inspect {
        /// Track file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scoretrack=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Build {
            notes,
            instruments,
            pages,
            display_pages,
            output,
            config,
            debug_dump,
        } => {
            let mut options = match &config {
                Some(path) => Options::load(path)?,
                None => Options::default(),
            };
            if debug_dump.is_some() {
                options.debug_dump_dir = debug_dump;
            }

            let inputs = Inputs {
                notes,
                instruments,
                pages,
                display_pages,
                output,
            };
            info!(
                "scoretrack v{}: {} page(s) → {}",
                env!("CARGO_PKG_VERSION"),
                inputs.pages.len(),
                inputs.output.display()
            );
            pipeline::run_with_options(&inputs, &options)
                .with_context(|| format!("failed to build '{}'", inputs.output.display()))?;
        }
        Command::Inspect { file } => {
            let track = scoretrack::inspect_file(&file)?;
            let page_sizes: Vec<usize> = track.pages.iter().map(Vec::len).collect();
            let out = json!({
                "instruments": track.instruments,
                "groups": track.groups,
                "page_sizes": page_sizes,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
