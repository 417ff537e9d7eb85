//! Viewport interaction driver
//!
//! Turns pan, zoom and window-resize notifications into tracker calls.
//! Tile work is skipped while a zoom is in flight and redone once the
//! interaction settles, at which point the viewport is re-derived from the
//! window size and the settled scale.
//!
//! Long moves are split into steps of at most one viewport per axis, the
//! way an interaction tracker reports a fling, so the tracker never has to
//! cover the whole distance in one update.

use tracing::{debug, trace};

use crate::grid::{Point, Size};
use crate::renderer::TileRenderer;
use crate::tracker::VisibleRegionTracker;
use crate::{InteractionConfig, RenderError};

/// Pan/zoom state on top of a [`VisibleRegionTracker`]
#[derive(Debug)]
pub struct ViewportController<R> {
    tracker: VisibleRegionTracker<R>,
    config: InteractionConfig,
    window: Size,
    position: Point,
    scale: f64,
    zooming: bool,
}

impl<R: TileRenderer> ViewportController<R> {
    pub fn new(tracker: VisibleRegionTracker<R>, config: InteractionConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            tracker,
            config,
            window: Size::default(),
            position: Point::default(),
            scale: 1.0,
            zooming: false,
        })
    }

    pub fn tracker(&self) -> &VisibleRegionTracker<R> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut VisibleRegionTracker<R> {
        &mut self.tracker
    }

    pub fn into_tracker(self) -> VisibleRegionTracker<R> {
        self.tracker
    }

    /// Last observed position, in scaled (screen) pixels
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn window_size(&self) -> Size {
        self.window
    }

    pub fn is_zooming(&self) -> bool {
        self.zooming
    }

    /// Window resized. A zero-sized (minimized) window is ignored.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<bool, RenderError> {
        if !(width > 0.0 && height > 0.0) {
            debug!(width, height, "ignoring empty window size");
            return Ok(true);
        }
        self.window = Size::new(width, height);
        self.refresh()
    }

    /// Interaction values changed (pan, inertia or zoom step)
    pub fn values_changed(&mut self, position: Point, scale: f64) -> Result<bool, RenderError> {
        let limit = self.tracker.surface_extent() as f64;
        let position = Point::new(position.x.clamp(0.0, limit), position.y.clamp(0.0, limit));
        let scale = self.config.clamp_scale(scale);
        trace!(x = position.x, y = position.y, scale, "values changed");

        self.position = position;
        if scale != self.scale {
            // Tiles are redrawn once the zoom settles
            self.zooming = true;
            self.scale = scale;
            return Ok(true);
        }
        if self.window == Size::default() {
            return Ok(true);
        }
        let unscaled = position.unscale(scale);
        self.tracker.update_position(unscaled.x, unscaled.y)
    }

    /// Interaction went idle; finish any deferred zoom
    pub fn idle_entered(&mut self) -> Result<bool, RenderError> {
        if !std::mem::take(&mut self.zooming) {
            return Ok(true);
        }
        debug!(scale = self.scale, "zoom settled");
        self.refresh()
    }

    /// Pan by a screen-space delta at the current scale
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Result<bool, RenderError> {
        self.scroll_to(Point::new(self.position.x + dx, self.position.y + dy))
    }

    /// Move to `target` at the current scale, one viewport at a time
    ///
    /// Stops at the first update that reports device loss; the position
    /// then holds the step that failed.
    pub fn scroll_to(&mut self, target: Point) -> Result<bool, RenderError> {
        let limit = self.tracker.surface_extent() as f64;
        let target = Point::new(target.x.clamp(0.0, limit), target.y.clamp(0.0, limit));
        if self.window == Size::default() {
            return self.values_changed(target, self.scale);
        }

        let mut steps = 0usize;
        loop {
            let next = Point::new(
                step_toward(self.position.x, target.x, self.window.width),
                step_toward(self.position.y, target.y, self.window.height),
            );
            steps += 1;
            if !self.values_changed(next, self.scale)? {
                return Ok(false);
            }
            if next == target {
                break;
            }
        }
        if steps > 1 {
            debug!(x = target.x, y = target.y, steps, "scrolled in steps");
        }
        Ok(true)
    }

    /// Re-derive the viewport from the window size and scale, then redraw
    pub fn refresh(&mut self) -> Result<bool, RenderError> {
        if self.window == Size::default() {
            return Ok(true);
        }
        let limit = self.tracker.surface_extent() as f64;
        let size = self.window.unscale(self.scale);
        if !self.tracker.set_viewport_size(size.width.min(limit), size.height.min(limit))? {
            return Ok(false);
        }
        // Resident tiles now sit at the origin
        let unscaled = self.position.unscale(self.scale);
        self.walk_tracker(Point::default(), unscaled)
    }

    /// Move the tracker from `from` to `to` in unscaled steps of one viewport
    fn walk_tracker(&mut self, from: Point, to: Point) -> Result<bool, RenderError> {
        let size = self.tracker.viewport().size;
        let mut at = from;
        loop {
            at = Point::new(
                step_toward(at.x, to.x, size.width),
                step_toward(at.y, to.y, size.height),
            );
            if !self.tracker.update_position(at.x, at.y)? {
                return Ok(false);
            }
            if at == to {
                return Ok(true);
            }
        }
    }
}

fn step_toward(from: f64, to: f64, max_step: f64) -> f64 {
    if (to - from).abs() <= max_step { to } else { from + max_step.copysign(to - from) }
}
