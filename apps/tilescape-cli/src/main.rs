use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tilescape_camera::CameraRig;
use tilescape_common::{CellCoord, Model, TilePersistence, ViewerConfig};
use tilescape_persist::TileDatabase;
use tilescape_render::{DebugTextRenderer, FrameView, Renderer};
use tilescape_stream::{BufferRole, BufferWrite, DeviceError, InstanceDevice, Reconcile, TileStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tilescape-cli", about = "CLI tool for tilescape worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML viewer config (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tile database directory, overrides the config
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, config and model catalog
    Info,
    /// Print the visible ground rectangle with the camera focused on a point
    Bounds {
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        x: f32,
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        z: f32,
    },
    /// Place a model at a cell and commit
    Place {
        #[arg(long, allow_negative_numbers = true)]
        x: i32,
        #[arg(long, allow_negative_numbers = true)]
        z: i32,
        /// Model name, e.g. LAVA or tree2
        #[arg(long, value_parser = parse_model)]
        model: Model,
    },
    /// Load the window around a point and print it
    Window {
        /// Focus x in world units (defaults to the saved position)
        #[arg(long, allow_negative_numbers = true)]
        x: Option<f32>,
        /// Focus z in world units (defaults to the saved position)
        #[arg(long, allow_negative_numbers = true)]
        z: Option<f32>,
        /// Also print the cell map
        #[arg(long)]
        map: bool,
    },
    /// Walk the segment hash chain
    Verify,
    /// Fold the journal into a new snapshot
    Compact,
}

fn parse_model(name: &str) -> Result<Model, String> {
    Model::ALL
        .into_iter()
        .find(|m| m.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| format!("unknown model `{name}`"))
}

/// Device for headless reconciles: buffers are unit values, uploads vanish.
struct HeadlessDevice;

impl InstanceDevice for HeadlessDevice {
    type Buffer = ();

    fn create_buffer(&mut self, _: BufferRole, _: u64, _: &str) -> Result<(), DeviceError> {
        Ok(())
    }

    fn release(&mut self, _: ()) {}

    fn upload(&mut self, _: &[BufferWrite<'_, ()>]) -> Result<(), DeviceError> {
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let tile_size = config.world.tile_size;

    match cli.command {
        Commands::Info => {
            println!("tilescape-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "tile size: {tile_size}  max height: {}",
                config.world.max_height
            );
            println!("data dir: {}", config.data_dir.display());
            println!("models:");
            for model in Model::ALL {
                println!(
                    "  {:>2} {:<10} height={:<4} illuminance={}",
                    model.id(),
                    model.name(),
                    model.height(),
                    model.illuminance()
                );
            }
        }
        Commands::Bounds { x, z } => {
            let mut rig = CameraRig::new(&config.camera, &config.world);
            rig.warp(x, z);
            let b = rig.bounds();
            let cells = b.to_cells(tile_size);
            println!("focus: ({x}, {z})");
            println!("bounds: x [{:.2}, {:.2}] z [{:.2}, {:.2}]", b.x1, b.x2, b.z1, b.z2);
            println!(
                "cells: x [{}, {}) z [{}, {}) ({} cells)",
                cells.min.x,
                cells.max.x,
                cells.min.z,
                cells.max.z,
                cells.area()
            );
        }
        Commands::Place { x, z, model } => {
            let mut db = TileDatabase::open(&config.data_dir)?;
            let mut store = TileStore::<()>::new(tile_size);
            store.edit_model(model, CellCoord::new(x, z), &mut db)?;
            let written = db.commit()?;
            println!("placed {model} at ({x}, {z}), {written} event(s) committed");
        }
        Commands::Window { x, z, map } => {
            let mut db = TileDatabase::open(&config.data_dir)?;
            let saved = db.saved_position();
            let focus = (x.unwrap_or(saved.x), z.unwrap_or(saved.z));

            let mut rig = CameraRig::new(&config.camera, &config.world);
            rig.warp(focus.0, focus.1);
            let mut store = TileStore::new(tile_size);
            if let Reconcile::Rebuilt(stats) =
                store.reconcile(&rig.bounds(), &mut db, &mut HeadlessDevice)?
            {
                tracing::info!(records = stats.records, elapsed = ?stats.elapsed, "window loaded");
            }

            let frame = FrameView::capture(&rig, &store).with_selected(saved.model);
            print!("{}", DebugTextRenderer::new().render(&frame));
            if map {
                print!("{}", DebugTextRenderer::cell_map(&store));
            }
        }
        Commands::Verify => {
            let db = TileDatabase::open(&config.data_dir)?;
            db.verify_integrity()?;
            println!(
                "OK: {} segment(s), {} tile(s)",
                db.manifest().entries.len(),
                db.tile_count()
            );
        }
        Commands::Compact => {
            let mut db = TileDatabase::open(&config.data_dir)?;
            db.compact()?;
            let meta = db.meta();
            println!(
                "compacted: snapshot {} at journal {}, {} tile(s)",
                meta.snapshot_count,
                meta.journal_count,
                db.tile_count()
            );
        }
    }

    Ok(())
}
