//! vsurf Render - Tiled Virtual Surfaces
//!
//! Presents an effectively unbounded drawable surface backed by a finite
//! texture budget. Only newly exposed tiles are drawn as the viewport pans,
//! and tiles that scroll away are trimmed.
//!
//! This crate provides:
//! - Tile grid addressing (pixel <-> row/column)
//! - Visible-region tracking with incremental strip draws and trimming
//! - A batched tile renderer that splits large updates into
//!   texture-sized draw sessions
//! - A CPU reference surface backed by tiny-skia, labelled with a system
//!   font found through fontdb
//! - An interaction driver that replays pan/zoom/resize callbacks
//!
//! # Example
//! ```rust,ignore
//! use vsurf_render::{RasterSurface, SurfaceTileRenderer, TileConfig, VisibleRegionTracker};
//!
//! let config = TileConfig::default();
//! let surface = RasterSurface::from_config(&config);
//! let renderer = SurfaceTileRenderer::new(surface, &config)?;
//! let mut tracker = VisibleRegionTracker::new(renderer, &config)?;
//! tracker.set_viewport_size(800.0, 600.0)?;
//! tracker.update_position(250.0, 0.0)?;
//! ```

mod config;
mod error;
pub mod font;
pub mod grid;
pub mod interaction;
pub mod label;
pub mod raster;
pub mod renderer;
pub mod surface;
pub mod tracker;

pub use config::{InteractionConfig, TileConfig};
pub use error::{RenderError, SurfaceError};
pub use font::LabelFont;
pub use grid::{PixelRect, Point, Size, Tile, TileBounds, TileGrid, TileIndex, TileRange};
pub use interaction::ViewportController;
pub use raster::RasterSurface;
pub use renderer::{partition, RendererStats, SurfaceTileRenderer, TileColor, TileRenderer};
pub use surface::{DrawSession, Offset, VirtualSurface};
pub use tracker::{Edge, Viewport, VisibleRegionTracker};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Color (RGBA)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const DIM_GRAY: Color = Color { r: 105, g: 105, b: 105, a: 255 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create from unit floats, clamped to `[0, 1]` and rounded to 8 bits
    pub fn from_unit(r: f32, g: f32, b: f32, a: f32) -> Self {
        fn channel(v: f32) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        Self::rgba(channel(r), channel(g), channel(b), channel(a))
    }

    /// Convert to a tiny-skia color
    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}
