//! vsurf Viewer - Main Entry Point
//!
//! Replays an interaction script against the raster surface and writes a
//! PNG of the final viewport.

mod script;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vsurf_render::{
    PixelRect, Point, RasterSurface, SurfaceError, SurfaceTileRenderer, ViewportController,
    VisibleRegionTracker,
};

use crate::script::{Script, Step};

type Controller = ViewportController<SurfaceTileRenderer<RasterSurface>>;

/// Replay a pan/zoom script against a tiled virtual surface
#[derive(Parser, Debug)]
#[command(name = "vsurf-viewer")]
#[command(version)]
struct Args {
    /// JSON interaction script (the built-in demo when omitted)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Where to write the PNG of the final viewport
    #[arg(short, long, default_value = "vsurf-snapshot.png")]
    out: PathBuf,
}

fn apply(controller: &mut Controller, step: &Step) -> Result<bool> {
    let done = match *step {
        Step::Resize { width, height } => controller.resize(width, height)?,
        Step::Pan { dx, dy } => controller.pan_by(dx, dy)?,
        Step::ScrollTo { x, y } => controller.scroll_to(Point::new(x, y))?,
        Step::Zoom { scale } => {
            let position = controller.position();
            controller.values_changed(position, scale)?
        }
        Step::Idle => controller.idle_entered()?,
        Step::LoseDevice { reset } => {
            let kind = if reset { SurfaceError::DeviceReset } else { SurfaceError::DeviceRemoved };
            surface_mut(controller).lose_device(kind);
            true
        }
        Step::RecreateDevice => {
            surface_mut(controller).recreate_device();
            // Resident bounds still describe content the device dropped
            controller.refresh()?
        }
    };
    Ok(done)
}

fn surface_mut(controller: &mut Controller) -> &mut RasterSurface {
    controller.tracker_mut().renderer_mut().surface_mut()
}

/// Current viewport in unscaled surface pixels, clamped to the surface
fn viewport_rect(controller: &Controller) -> Option<PixelRect> {
    let scale = controller.scale();
    let position = controller.position().unscale(scale);
    let size = controller.window_size().unscale(scale);
    let rect = PixelRect::new(
        position.x.floor() as i64,
        position.y.floor() as i64,
        size.width.ceil() as i64,
        size.height.ceil() as i64,
    );
    let extent = controller.tracker().surface_extent();
    rect.intersection(&PixelRect::new(0, 0, extent, extent))
}

/// Build the raster stack for `script` and apply every step
fn replay(script: &Script) -> Result<Controller> {
    let surface = RasterSurface::from_config(&script.tiles);
    let renderer = SurfaceTileRenderer::new(surface, &script.tiles).context("invalid tile configuration")?;
    let tracker = VisibleRegionTracker::new(renderer, &script.tiles)?;
    let mut controller = ViewportController::new(tracker, script.interaction.clone())
        .context("invalid interaction configuration")?;

    for (index, step) in script.steps.iter().enumerate() {
        let done = apply(&mut controller, step).with_context(|| format!("step {index} ({step:?}) failed"))?;
        let outcome = if done { "completed" } else { "deferred by device loss" };
        info!(
            index,
            ?step,
            outcome,
            resident = ?controller.tracker().resident_bounds(),
            "step applied"
        );
    }
    Ok(controller)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let script = match &args.script {
        Some(path) => Script::load(path)?,
        None => Script::demo(),
    };
    info!(version = vsurf_render::VERSION, steps = script.steps.len(), "starting vsurf viewer");

    let controller = replay(&script)?;

    let renderer = controller.tracker().renderer();
    let surface = renderer.surface();
    info!(
        stats = ?renderer.stats(),
        chunks = surface.resident_chunks(),
        bytes = surface.resident_bytes(),
        "script finished"
    );

    let Some(rect) = viewport_rect(&controller) else {
        bail!("viewport is empty, nothing to snapshot");
    };
    let pixmap = surface.snapshot(rect).with_context(|| format!("failed to snapshot {rect:?}"))?;
    pixmap
        .save_png(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(path = %args.out.display(), ?rect, "snapshot written");

    Ok(())
}
