//! Batched Tile Rendering
//!
//! Turns a tile-range request into one or more draw sessions on a virtual
//! surface. A single session cannot cover more than one hardware texture,
//! so large updates are split into sub-rectangles and every tile is drawn
//! into each sub-rectangle it touches.

use tracing::{debug, warn};

use crate::grid::{PixelRect, Tile};
use crate::surface::{DrawSession, VirtualSurface};
use crate::{Color, RenderError, TileConfig};

/// Capability the visible-region tracker drives
pub trait TileRenderer {
    /// Draw `tiles` into the surface area `rect`
    ///
    /// Returns `Ok(false)` when the device was lost part way; remaining
    /// sub-rectangles are skipped and the caller retries later. Any other
    /// failure is an error.
    fn draw_range(&mut self, rect: PixelRect, tiles: &[Tile]) -> Result<bool, RenderError>;

    /// Release surface storage outside `keep`
    fn trim(&mut self, keep: PixelRect) -> Result<(), RenderError>;
}

impl<R: TileRenderer + ?Sized> TileRenderer for &mut R {
    fn draw_range(&mut self, rect: PixelRect, tiles: &[Tile]) -> Result<bool, RenderError> {
        (**self).draw_range(rect, tiles)
    }

    fn trim(&mut self, keep: PixelRect) -> Result<(), RenderError> {
        (**self).trim(keep)
    }
}

/// Split `rect` into row-major sub-rectangles no larger than `max_extent` per axis
pub fn partition(rect: PixelRect, max_extent: i64) -> impl Iterator<Item = PixelRect> {
    let step = max_extent.max(1);
    let (left, right) = (rect.x, rect.right());
    let (top, bottom) = (rect.y, rect.bottom());
    let ys = std::iter::successors(Some(top), move |y| Some(y + step)).take_while(move |y| *y < bottom);
    ys.flat_map(move |y| {
        std::iter::successors(Some(left), move |x| Some(x + step))
            .take_while(move |x| *x < right)
            .map(move |x| PixelRect::new(x, y, step.min(right - x), step.min(bottom - y)))
    })
}

/// Rotating per-tile colour
///
/// Deterministic, so repeated runs paint identical surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileColor {
    counter: u32,
}

impl TileColor {
    pub const STEP: u32 = 8;
    pub const PERIOD: u32 = 192;

    pub const fn new(counter: u32) -> Self {
        Self { counter: counter % Self::PERIOD }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Move the counter forward by `steps` tile draws
    pub fn advance(&mut self, steps: usize) {
        let cycle = (Self::PERIOD / Self::STEP) as usize;
        let steps = (steps % cycle) as u32;
        self.counter = (self.counter + Self::STEP * steps) % Self::PERIOD;
    }

    /// Colour for the current counter
    pub fn color(&self) -> Color {
        Color::from_unit(self.counter as f32 / 256.0, 1.0, 0.0, 0.5)
    }

    /// Colour of the `index`-th tile drawn after this state
    pub fn color_at(&self, index: usize) -> Color {
        let mut next = *self;
        next.advance(index + 1);
        next.color()
    }
}

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// `draw_range` calls that reached the surface
    pub batches: u64,
    /// Draw sessions opened
    pub sessions: u64,
    /// Tile draws, counting a tile once per sub-rectangle it touches
    pub tiles_drawn: u64,
    pub trims: u64,
    pub device_losses: u64,
}

/// Tile renderer over any [`VirtualSurface`]
#[derive(Debug)]
pub struct SurfaceTileRenderer<S> {
    surface: S,
    tile_size: i64,
    max_session_extent: i64,
    border_margin: i64,
    color: TileColor,
    stats: RendererStats,
}

impl<S: VirtualSurface> SurfaceTileRenderer<S> {
    pub fn new(surface: S, config: &TileConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            surface,
            tile_size: i64::from(config.tile_size),
            max_session_extent: config.max_session_extent(),
            border_margin: i64::from(config.border_margin),
            color: TileColor::default(),
            stats: RendererStats::default(),
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    pub fn color(&self) -> TileColor {
        self.color
    }

    pub fn tile_size(&self) -> i64 {
        self.tile_size
    }

    pub fn max_session_extent(&self) -> i64 {
        self.max_session_extent
    }
}

impl<S: VirtualSurface> TileRenderer for SurfaceTileRenderer<S> {
    fn draw_range(&mut self, rect: PixelRect, tiles: &[Tile]) -> Result<bool, RenderError> {
        let extent = self.surface.extent();
        let Some(update) = rect.intersection(&PixelRect::new(0, 0, extent, extent)) else {
            debug!(?rect, "update lies outside the surface, nothing to draw");
            return Ok(true);
        };

        self.stats.batches += 1;

        for sub in partition(update, self.max_session_extent) {
            let mut session = match DrawSession::begin(&mut self.surface, sub) {
                Ok(session) => session,
                Err(err) if err.is_device_lost() => {
                    warn!(?sub, %err, "device lost while opening draw session, skipping update");
                    self.stats.device_losses += 1;
                    return Ok(false);
                }
                Err(err) => return Err(err.into()),
            };
            self.stats.sessions += 1;
            debug!(?sub, offset = ?session.offset(), "draw session opened");

            session.clear(Color::TRANSPARENT)?;
            let (dx, dy) = session.delta();
            // Colour follows the tile's position in the batch, so a tile split
            // across sub-rectangles is painted the same in every piece
            let touching = tiles.iter().enumerate().filter(|(_, tile)| tile.rect.intersects(&sub));
            for (index, tile) in touching {
                let fill = tile.rect.translate(dx, dy).shrink(self.border_margin);
                session.fill_rect(fill, self.color.color_at(index))?;
                session.draw_label(&tile.label(), fill, Color::DIM_GRAY)?;
                self.stats.tiles_drawn += 1;
            }

            match session.finish() {
                Ok(()) => {}
                Err(err) if err.is_device_lost() => {
                    warn!(?sub, %err, "device lost while ending draw session, skipping update");
                    self.stats.device_losses += 1;
                    return Ok(false);
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.color.advance(tiles.len());
        Ok(true)
    }

    fn trim(&mut self, keep: PixelRect) -> Result<(), RenderError> {
        debug!(?keep, "trimming surface");
        self.surface.trim(&[keep])?;
        self.stats.trims += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{TileGrid, TileRange};
    use crate::surface::Offset;
    use crate::SurfaceError;

    #[derive(Debug, Default)]
    struct LogSurface {
        sessions: Vec<PixelRect>,
        fills: Vec<(PixelRect, Color)>,
        labels: Vec<String>,
        trims: Vec<Vec<PixelRect>>,
        lose_on_session: Option<usize>,
        lose_on_end: Option<usize>,
        open: bool,
        ends: usize,
    }

    impl VirtualSurface for LogSurface {
        fn extent(&self) -> i64 {
            10_000
        }

        fn begin_draw(&mut self, update: PixelRect) -> Result<Offset, SurfaceError> {
            if self.lose_on_session == Some(self.sessions.len()) {
                return Err(SurfaceError::DeviceReset);
            }
            assert!(!self.open, "nested session");
            self.open = true;
            self.sessions.push(update);
            Ok(Offset::new(0, 0))
        }

        fn end_draw(&mut self) -> Result<(), SurfaceError> {
            assert!(self.open, "end without begin");
            self.open = false;
            let lost = self.lose_on_end == Some(self.ends);
            self.ends += 1;
            if lost {
                return Err(SurfaceError::DeviceRemoved);
            }
            Ok(())
        }

        fn clear(&mut self, _color: Color) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn fill_rect(&mut self, rect: PixelRect, color: Color) -> Result<(), SurfaceError> {
            self.fills.push((rect, color));
            Ok(())
        }

        fn draw_label(&mut self, text: &str, _rect: PixelRect, _color: Color) -> Result<(), SurfaceError> {
            self.labels.push(text.to_string());
            Ok(())
        }

        fn trim(&mut self, keep: &[PixelRect]) -> Result<(), SurfaceError> {
            self.trims.push(keep.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_partition_bounds() {
        let rect = PixelRect::new(100, 50, 5000, 2100);
        let parts: Vec<_> = partition(rect, 2045).collect();
        assert_eq!(parts.len(), 3 * 2);
        for part in &parts {
            assert!(part.width <= 2045 && part.height <= 2045);
            assert!(rect.contains(part));
        }
        let area: i64 = parts.iter().map(|p| p.width * p.height).sum();
        assert_eq!(area, 5000 * 2100);
        // Row-major
        assert_eq!(parts[0], PixelRect::new(100, 50, 2045, 2045));
        assert_eq!(parts[1], PixelRect::new(2145, 50, 2045, 2045));
        assert_eq!(parts[2], PixelRect::new(4190, 50, 910, 2045));
        assert_eq!(parts[3], PixelRect::new(100, 2095, 2045, 55));
    }

    #[test]
    fn test_partition_small_and_empty() {
        let one: Vec<_> = partition(PixelRect::new(0, 0, 500, 500), 2045).collect();
        assert_eq!(one, vec![PixelRect::new(0, 0, 500, 500)]);
        assert_eq!(partition(PixelRect::new(0, 0, 0, 500), 2045).count(), 0);
    }

    #[test]
    fn test_tile_color_sequence() {
        let mut color = TileColor::default();
        assert_eq!(color.color_at(0), Color::rgba(8, 255, 0, 128));
        assert_eq!(color.color_at(1), Color::rgba(16, 255, 0, 128));
        color.advance(23);
        assert_eq!(color.counter(), 184);
        color.advance(1);
        assert_eq!(color.counter(), 0);
        // Full cycles are a no-op
        color.advance(24 * 5 + 2);
        assert_eq!(color.counter(), 16);
        assert_eq!(TileColor::new(200).counter(), 8);
    }

    #[test]
    fn test_draw_range_single_session() {
        let config = TileConfig::default();
        let mut renderer = SurfaceTileRenderer::new(LogSurface::default(), &config).unwrap();
        let grid = TileGrid::new(100);
        let range = TileRange::new(0, 0, 5, 5);

        let ok = renderer.draw_range(grid.pixel_rect_of_range(range), &grid.tiles_in(range)).unwrap();
        assert!(ok);

        let surface = renderer.surface();
        assert_eq!(surface.sessions, vec![PixelRect::new(0, 0, 500, 500)]);
        assert_eq!(surface.ends, 1);
        assert_eq!(surface.fills.len(), 25);
        // Border margin leaves a 5px gutter
        assert_eq!(surface.fills[0].0, PixelRect::new(0, 0, 95, 95));
        assert_eq!(surface.labels[1], "1,0");
        assert_eq!(renderer.stats().tiles_drawn, 25);
        assert_eq!(renderer.color().counter(), (25 * 8) % 192);
    }

    #[test]
    fn test_draw_range_splits_large_updates() {
        let config = TileConfig::default();
        let mut renderer = SurfaceTileRenderer::new(LogSurface::default(), &config).unwrap();
        let grid = TileGrid::new(100);
        let range = TileRange::new(0, 0, 30, 1);

        assert!(renderer.draw_range(grid.pixel_rect_of_range(range), &grid.tiles_in(range)).unwrap());

        let surface = renderer.surface();
        assert_eq!(surface.sessions.len(), 2);
        assert_eq!(surface.sessions[0], PixelRect::new(0, 0, 2045, 100));
        assert_eq!(surface.sessions[1], PixelRect::new(2045, 0, 955, 100));
        // Tile 20 straddles the split and is drawn in both sessions
        assert_eq!(surface.fills.len(), 21 + 10);
        assert_eq!(renderer.stats().sessions, 2);

        // The straddling tile keeps its colour in both pieces
        let first_pass_tile_20 = surface.fills[20].1;
        let second_pass_tile_20 = surface.fills[21].1;
        assert_eq!(first_pass_tile_20, Color::from_unit(168.0 / 256.0, 1.0, 0.0, 0.5));
        assert_eq!(first_pass_tile_20, second_pass_tile_20);
        assert_eq!(surface.fills[21].0.x, 2000 - 2045);
        assert_eq!(renderer.color().counter(), (30 * 8) % 192);
    }

    #[test]
    fn test_draw_range_device_loss_stops_batch() {
        let config = TileConfig::default();
        let surface = LogSurface { lose_on_session: Some(1), ..LogSurface::default() };
        let mut renderer = SurfaceTileRenderer::new(surface, &config).unwrap();
        let grid = TileGrid::new(100);
        let range = TileRange::new(0, 0, 50, 1);

        let ok = renderer.draw_range(grid.pixel_rect_of_range(range), &grid.tiles_in(range)).unwrap();
        assert!(!ok);
        assert_eq!(renderer.surface().sessions.len(), 1);
        assert_eq!(renderer.surface().ends, 1);
        assert_eq!(renderer.stats().device_losses, 1);
    }

    #[test]
    fn test_draw_range_device_loss_on_end() {
        let config = TileConfig::default();
        let surface = LogSurface { lose_on_end: Some(0), ..LogSurface::default() };
        let mut renderer = SurfaceTileRenderer::new(surface, &config).unwrap();
        let grid = TileGrid::new(100);
        let range = TileRange::new(0, 0, 50, 1);

        let ok = renderer.draw_range(grid.pixel_rect_of_range(range), &grid.tiles_in(range)).unwrap();
        assert!(!ok);
        // Remaining sub-rectangles are skipped and the session is ended once
        assert_eq!(renderer.surface().sessions, vec![PixelRect::new(0, 0, 2045, 100)]);
        assert_eq!(renderer.surface().ends, 1);
        assert!(!renderer.surface().open);
        let stats = renderer.stats();
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.device_losses, 1);
        assert_eq!(stats.tiles_drawn, 21);
        // Colours are reused when the batch is retried
        assert_eq!(renderer.color().counter(), 0);
    }

    #[test]
    fn test_draw_range_clamps_to_surface() {
        let config = TileConfig::default();
        let mut renderer = SurfaceTileRenderer::new(LogSurface::default(), &config).unwrap();
        let grid = TileGrid::new(100);

        let range = TileRange::new(99, 0, 3, 1);
        assert!(renderer.draw_range(grid.pixel_rect_of_range(range), &grid.tiles_in(range)).unwrap());
        assert_eq!(renderer.surface().sessions, vec![PixelRect::new(9_900, 0, 100, 100)]);
        assert_eq!(renderer.surface().fills.len(), 1);

        let outside = TileRange::new(200, 0, 1, 1);
        assert!(renderer.draw_range(grid.pixel_rect_of_range(outside), &grid.tiles_in(outside)).unwrap());
        assert_eq!(renderer.stats().batches, 1);
    }

    #[test]
    fn test_trim_forwards_rect() {
        let config = TileConfig::default();
        let mut renderer = SurfaceTileRenderer::new(LogSurface::default(), &config).unwrap();
        renderer.trim(PixelRect::new(100, 0, 500, 500)).unwrap();
        assert_eq!(renderer.surface().trims, vec![vec![PixelRect::new(100, 0, 500, 500)]]);
        assert_eq!(renderer.stats().trims, 1);
    }
}
