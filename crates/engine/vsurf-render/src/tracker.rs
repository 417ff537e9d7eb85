//! Visible-Region Tracker
//!
//! Keeps the tiles covering the viewport resident on the surface. Each
//! position update compares the tiles the viewport needs against the tiles
//! already drawn, draws only the newly exposed strips, and trims the
//! surface back to exactly what is needed.
//!
//! Edge order matters: the top and bottom strips span the old columns and
//! are committed before the left and right strips are sized, so the side
//! strips cover the full new row span. Corners are drawn once.

use tracing::{debug, info};

use crate::grid::{Point, Size, TileBounds, TileGrid, TileRange};
use crate::renderer::TileRenderer;
use crate::{RenderError, TileConfig};

/// Viewport position and size in surface pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub position: Point,
    pub size: Size,
}

/// Surface edge a strip was drawn for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Tracks resident tiles and drives a [`TileRenderer`]
#[derive(Debug)]
pub struct VisibleRegionTracker<R> {
    renderer: R,
    grid: TileGrid,
    draw_ahead: i32,
    surface_extent: i64,
    viewport: Viewport,
    resident: TileBounds,
    horizontal_visible_tiles: i32,
    vertical_visible_tiles: i32,
}

impl<R: TileRenderer> VisibleRegionTracker<R> {
    /// Create a tracker that exclusively owns `renderer`
    pub fn new(renderer: R, config: &TileConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            renderer,
            grid: TileGrid::new(config.tile_size),
            draw_ahead: config.draw_ahead as i32,
            surface_extent: config.surface_extent(),
            viewport: Viewport::default(),
            resident: TileBounds::default(),
            horizontal_visible_tiles: 0,
            vertical_visible_tiles: 0,
        })
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    pub fn grid(&self) -> TileGrid {
        self.grid
    }

    pub fn draw_ahead(&self) -> i32 {
        self.draw_ahead
    }

    /// Backing surface edge length in pixels
    pub fn surface_extent(&self) -> i64 {
        self.surface_extent
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Tiles currently holding drawn content
    pub fn resident_bounds(&self) -> TileBounds {
        self.resident
    }

    /// (horizontal, vertical) tile counts covering the viewport size
    pub fn visible_tile_counts(&self) -> (i32, i32) {
        (self.horizontal_visible_tiles, self.vertical_visible_tiles)
    }

    /// Tiles the viewport needs at `position`, widened by the draw-ahead margin
    ///
    /// The far viewport edge is exclusive; the near edges never go below 0.
    pub fn required_bounds(&self, position: Point) -> TileBounds {
        let size = f64::from(self.grid.tile_size());
        let Size { width, height } = self.viewport.size;
        let top = ((position.y / size).floor() as i32 - self.draw_ahead).max(0);
        let left = ((position.x / size).floor() as i32 - self.draw_ahead).max(0);
        let bottom = ((position.y + height) / size).ceil() as i32 - 1 + self.draw_ahead;
        let right = ((position.x + width) / size).ceil() as i32 - 1 + self.draw_ahead;
        TileBounds::new(top, bottom, left, right)
    }

    /// Resize the viewport and redraw the visible range from the origin
    ///
    /// Sizes must be positive and no larger than the surface. Returns
    /// `Ok(false)` on device loss; resident bounds are left as they were.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) -> Result<bool, RenderError> {
        let limit = self.surface_extent as f64;
        let valid = |v: f64| v.is_finite() && v > 0.0 && v <= limit;
        if !valid(width) || !valid(height) {
            return Err(RenderError::InvalidViewport { width, height });
        }

        self.viewport.size = Size::new(width, height);
        self.horizontal_visible_tiles = self.grid.tiles_to_cover(width);
        self.vertical_visible_tiles = self.grid.tiles_to_cover(height);

        let columns = self.horizontal_visible_tiles + self.draw_ahead;
        let rows = self.vertical_visible_tiles + self.draw_ahead;
        info!(width, height, columns, rows, "viewport resized, drawing visible tiles");

        // TODO: reconcile with the current position instead of re-drawing from tile (0, 0)
        if !self.draw_range(TileRange::new(0, 0, columns, rows))? {
            return Ok(false);
        }
        self.resident = TileBounds::new(0, rows - 1, 0, columns - 1);
        Ok(true)
    }

    /// Move the viewport, drawing newly exposed strips and trimming the rest
    ///
    /// Returns `Ok(false)` on device loss: no further strips are drawn, no
    /// trim is issued, and resident bounds are unchanged so the next update
    /// retries the same delta.
    pub fn update_position(&mut self, x: f64, y: f64) -> Result<bool, RenderError> {
        let position = Point::new(x, y);
        self.viewport.position = position;

        let required = self.required_bounds(position);
        let mut drawn = self.resident;
        let mut state_update = false;

        // Top and bottom strips span the currently drawn columns
        let columns = drawn.right - drawn.left + 1;
        let rows = drawn.top - required.top;
        if rows > 0 && columns > 0 {
            let range = TileRange::new(drawn.left, required.top, columns, rows);
            if !self.draw_strip(Edge::Top, range)? {
                return Ok(false);
            }
            state_update = true;
        }

        let rows = required.bottom - drawn.bottom;
        if rows > 0 && columns > 0 {
            let range = TileRange::new(drawn.left, drawn.bottom + 1, columns, rows);
            if !self.draw_strip(Edge::Bottom, range)? {
                return Ok(false);
            }
            state_update = true;
        }

        drawn.top = drawn.top.min(required.top);
        drawn.bottom = drawn.bottom.max(required.bottom);

        // Left and right strips span the updated rows
        let rows = drawn.bottom - drawn.top + 1;
        let columns = drawn.left - required.left;
        if rows > 0 && columns > 0 {
            let range = TileRange::new(required.left, drawn.top, columns, rows);
            if !self.draw_strip(Edge::Left, range)? {
                return Ok(false);
            }
            state_update = true;
        }

        let columns = required.right - drawn.right;
        if rows > 0 && columns > 0 {
            let range = TileRange::new(drawn.right + 1, drawn.top, columns, rows);
            if !self.draw_strip(Edge::Right, range)? {
                return Ok(false);
            }
            state_update = true;
        }

        drawn.left = drawn.left.min(required.left);
        drawn.right = drawn.right.max(required.right);

        if state_update {
            self.renderer.trim(self.grid.pixel_rect_of_bounds(required))?;
            debug!(?required, "trimmed to required tiles");
            self.resident = required;
        } else {
            self.resident = drawn;
        }
        Ok(true)
    }

    fn draw_strip(&mut self, edge: Edge, range: TileRange) -> Result<bool, RenderError> {
        debug!(?edge, ?range, "drawing newly exposed strip");
        self.draw_range(range)
    }

    fn draw_range(&mut self, range: TileRange) -> Result<bool, RenderError> {
        let rect = self.grid.pixel_rect_of_range(range);
        let tiles = self.grid.tiles_in(range);
        self.renderer.draw_range(rect, &tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{PixelRect, Tile};

    #[derive(Debug, Default)]
    struct Recorder {
        draws: Vec<(PixelRect, usize)>,
        trims: Vec<PixelRect>,
        fail_draw: Option<usize>,
    }

    impl TileRenderer for Recorder {
        fn draw_range(&mut self, rect: PixelRect, tiles: &[Tile]) -> Result<bool, RenderError> {
            if self.fail_draw == Some(self.draws.len()) {
                self.fail_draw = None;
                return Ok(false);
            }
            self.draws.push((rect, tiles.len()));
            Ok(true)
        }

        fn trim(&mut self, keep: PixelRect) -> Result<(), RenderError> {
            self.trims.push(keep);
            Ok(())
        }
    }

    fn tracker() -> VisibleRegionTracker<Recorder> {
        VisibleRegionTracker::new(Recorder::default(), &TileConfig::default()).unwrap()
    }

    #[test]
    fn test_bootstrap() {
        let mut tracker = tracker();
        assert!(tracker.set_viewport_size(500.0, 500.0).unwrap());
        assert_eq!(tracker.visible_tile_counts(), (5, 5));
        assert_eq!(tracker.resident_bounds(), TileBounds::new(0, 4, 0, 4));
        assert_eq!(tracker.renderer().draws, vec![(PixelRect::new(0, 0, 500, 500), 25)]);
        assert!(tracker.renderer().trims.is_empty());
    }

    #[test]
    fn test_partial_tiles_round_up() {
        let mut tracker = tracker();
        tracker.set_viewport_size(450.0, 101.0).unwrap();
        assert_eq!(tracker.visible_tile_counts(), (5, 2));
        assert_eq!(tracker.resident_bounds(), TileBounds::new(0, 1, 0, 4));
    }

    #[test]
    fn test_required_bounds() {
        let mut tracker = tracker();
        tracker.set_viewport_size(500.0, 500.0).unwrap();
        assert_eq!(tracker.required_bounds(Point::new(0.0, 0.0)), TileBounds::new(0, 4, 0, 4));
        assert_eq!(tracker.required_bounds(Point::new(100.0, 0.0)), TileBounds::new(0, 4, 1, 5));
        assert_eq!(tracker.required_bounds(Point::new(150.0, 30.0)), TileBounds::new(0, 5, 1, 6));
        // Near edges clamp at zero
        assert_eq!(tracker.required_bounds(Point::new(-250.0, -10.0)), TileBounds::new(0, 4, 0, 2));
    }

    #[test]
    fn test_invalid_viewport() {
        let mut tracker = tracker();
        assert!(matches!(
            tracker.set_viewport_size(0.0, 10.0),
            Err(RenderError::InvalidViewport { .. })
        ));
        assert!(tracker.set_viewport_size(10.0, f64::NAN).is_err());
        assert!(tracker.renderer().draws.is_empty());
    }

    #[test]
    fn test_viewport_larger_than_surface_rejected() {
        let mut tracker = tracker();
        assert!(matches!(
            tracker.set_viewport_size(1e12, 500.0),
            Err(RenderError::InvalidViewport { .. })
        ));
        assert!(tracker.set_viewport_size(500.0, 1_000_001.0).is_err());
        assert!(tracker.renderer().draws.is_empty());
        assert_eq!(tracker.visible_tile_counts(), (0, 0));

        // Exactly the surface is fine
        assert!(tracker.set_viewport_size(1_000_000.0, 100.0).unwrap());
        assert_eq!(tracker.visible_tile_counts(), (10_000, 1));
    }

    #[test]
    fn test_right_pan_draws_one_column() {
        let mut tracker = tracker();
        tracker.set_viewport_size(500.0, 500.0).unwrap();
        assert!(tracker.update_position(100.0, 0.0).unwrap());

        let recorder = tracker.renderer();
        assert_eq!(recorder.draws.len(), 2);
        assert_eq!(recorder.draws[1], (PixelRect::new(500, 0, 100, 500), 5));
        assert_eq!(recorder.trims, vec![PixelRect::new(100, 0, 500, 500)]);
        assert_eq!(tracker.resident_bounds(), TileBounds::new(0, 4, 1, 5));
    }

    #[test]
    fn test_small_pan_inside_resident_is_free() {
        let mut tracker = tracker();
        tracker.set_viewport_size(500.0, 500.0).unwrap();
        tracker.update_position(0.0, 0.0).unwrap();
        tracker.update_position(0.0, 0.0).unwrap();
        assert_eq!(tracker.renderer().draws.len(), 1);
        assert!(tracker.renderer().trims.is_empty());
    }

    #[test]
    fn test_diagonal_pan_covers_corner_once() {
        let mut tracker = tracker();
        tracker.set_viewport_size(500.0, 500.0).unwrap();
        tracker.update_position(200.0, 100.0).unwrap();

        let recorder = tracker.renderer();
        // Bottom strip over the old columns, then the right strip over the new rows
        assert_eq!(recorder.draws[1], (PixelRect::new(0, 500, 500, 100), 5));
        assert_eq!(recorder.draws[2], (PixelRect::new(500, 0, 200, 600), 12));
        assert_eq!(recorder.draws.len(), 3);
        assert_eq!(tracker.resident_bounds(), TileBounds::new(1, 5, 2, 6));
        assert_eq!(recorder.trims, vec![PixelRect::new(200, 100, 500, 500)]);
    }

    #[test]
    fn test_pan_back_draws_top_and_left() {
        let mut tracker = tracker();
        tracker.set_viewport_size(500.0, 500.0).unwrap();
        tracker.update_position(300.0, 300.0).unwrap();
        assert_eq!(tracker.resident_bounds(), TileBounds::new(3, 7, 3, 7));

        tracker.update_position(100.0, 200.0).unwrap();
        let recorder = tracker.renderer();
        let n = recorder.draws.len();
        // Top strip (row 2, old columns 3..7), then left strip (columns 1..2, rows 2..7)
        assert_eq!(recorder.draws[n - 2], (PixelRect::new(300, 200, 500, 100), 5));
        assert_eq!(recorder.draws[n - 1], (PixelRect::new(100, 200, 200, 600), 12));
        assert_eq!(tracker.resident_bounds(), TileBounds::new(2, 6, 1, 5));
    }

    #[test]
    fn test_device_loss_keeps_resident_bounds() {
        let mut tracker = tracker();
        tracker.set_viewport_size(500.0, 500.0).unwrap();
        // Bootstrap was draw 0, the first strip is draw 1
        tracker.renderer_mut().fail_draw = Some(1);

        assert!(!tracker.update_position(100.0, 100.0).unwrap());
        assert_eq!(tracker.resident_bounds(), TileBounds::new(0, 4, 0, 4));
        assert!(tracker.renderer().trims.is_empty());
        assert_eq!(tracker.viewport().position, Point::new(100.0, 100.0));

        // The retry draws the same delta
        assert!(tracker.update_position(100.0, 100.0).unwrap());
        assert_eq!(tracker.resident_bounds(), TileBounds::new(1, 5, 1, 5));
        assert_eq!(tracker.renderer().trims.len(), 1);
    }

    #[test]
    fn test_device_loss_on_bootstrap() {
        let mut tracker = tracker();
        tracker.renderer_mut().fail_draw = Some(0);
        assert!(!tracker.set_viewport_size(500.0, 500.0).unwrap());
        assert_eq!(tracker.resident_bounds(), TileBounds::default());
    }

    #[test]
    fn test_draw_ahead_widens_required() {
        let config = TileConfig { draw_ahead: 1, ..TileConfig::default() };
        let mut tracker = VisibleRegionTracker::new(Recorder::default(), &config).unwrap();
        tracker.set_viewport_size(500.0, 500.0).unwrap();
        assert_eq!(tracker.resident_bounds(), TileBounds::new(0, 5, 0, 5));
        assert_eq!(tracker.required_bounds(Point::new(300.0, 300.0)), TileBounds::new(2, 8, 2, 8));
    }
}
