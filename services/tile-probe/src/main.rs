//! Tile probe.
//!
//! Exercises the tile pipeline from the command line:
//! - `resolve` discovers an OGC API - Tiles tile matrix set and prints the grid
//! - `fetch-tile` downloads one tile and uploads it through a tile texture
//! - `composite` renders a tile from a synthetic multi-source raster

mod config;
mod gpu;
mod probe;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{parse_context_pair, ProbeProfile};
use tile_common::TileCoord;

#[derive(Parser, Debug)]
#[command(name = "tile-probe")]
#[command(about = "Probe OGC API - Tiles endpoints and the tile texture pipeline")]
struct Args {
    /// YAML probe profile
    #[arg(long, env = "PROBE_PROFILE")]
    profile: Option<PathBuf>,

    /// Tileset description URL
    #[arg(long, env = "TILESET_URL")]
    url: Option<String>,

    /// Tile matrix set id (default: WebMercatorQuad)
    #[arg(long)]
    tile_matrix_set: Option<String>,

    /// Extra URL template value, repeatable (key=value)
    #[arg(long = "context", value_parser = parse_context_pair)]
    context: Vec<(String, String)>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "PROBE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the tile matrix set and print its grid
    Resolve {
        /// Level whose first tile URLs are printed
        #[arg(long, default_value = "0")]
        sample_level: u32,
    },

    /// Download a tile and upload it through a tile texture
    FetchTile {
        z: u32,
        x: u32,
        y: u32,
        /// Save the decoded tile as PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Composite a tile from synthetic in-memory rasters
    Composite {
        z: u32,
        x: u32,
        y: u32,
        /// Number of single-band sources (1-3)
        #[arg(long, default_value = "1")]
        sources: usize,
        /// Nodata value shared by all sources
        #[arg(long)]
        nodata: Option<f64>,
        /// Save the composited tile as PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let profile = match &args.profile {
        Some(path) => ProbeProfile::load(path)?,
        None => ProbeProfile::default(),
    }
    .merge(
        args.url.clone(),
        args.tile_matrix_set.clone(),
        &args.context,
        args.timeout_secs,
    );

    match args.command {
        Command::Resolve { sample_level } => {
            let resolver = probe::resolve(&profile).await?;
            probe::print_summary(&resolver, sample_level)?;
        }
        Command::FetchTile { z, x, y, output } => {
            let resolver = probe::resolve(&profile).await?;
            probe::fetch_tile(&profile, &resolver, TileCoord::new(z, x, y), output.as_deref()).await?;
        }
        Command::Composite {
            z,
            x,
            y,
            sources,
            nodata,
            output,
        } => {
            probe::composite_demo(TileCoord::new(z, x, y), sources, nodata, output.as_deref()).await?;
        }
    }

    info!("Probe finished");
    Ok(())
}
