//! Virtual Surface Capability
//!
//! The drawing backend a tile renderer targets: a surface far larger than
//! any single texture, drawn through short begin/end sessions that each
//! cover one update rectangle.

use crate::grid::PixelRect;
use crate::{Color, SurfaceError};

/// Origin offset reported by a draw session
///
/// The top-left of the update rectangle lands at this point inside the
/// session's drawing context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
}

impl Offset {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Backing store for a tiled virtual surface
///
/// Drawing calls (`clear`, `fill_rect`, `draw_label`) use session
/// coordinates and are only legal between `begin_draw` and `end_draw`.
/// At most one session is open at a time.
pub trait VirtualSurface {
    /// Edge length of the (square) surface in pixels
    fn extent(&self) -> i64;

    /// Open a session covering `update`
    fn begin_draw(&mut self, update: PixelRect) -> Result<Offset, SurfaceError>;

    /// Commit and close the open session
    fn end_draw(&mut self) -> Result<(), SurfaceError>;

    fn clear(&mut self, color: Color) -> Result<(), SurfaceError>;

    fn fill_rect(&mut self, rect: PixelRect, color: Color) -> Result<(), SurfaceError>;

    /// Draw `text` centred in `rect`
    fn draw_label(&mut self, text: &str, rect: PixelRect, color: Color) -> Result<(), SurfaceError>;

    /// Content outside every `keep` rectangle may be discarded
    fn trim(&mut self, keep: &[PixelRect]) -> Result<(), SurfaceError>;
}

impl<S: VirtualSurface + ?Sized> VirtualSurface for &mut S {
    fn extent(&self) -> i64 {
        (**self).extent()
    }

    fn begin_draw(&mut self, update: PixelRect) -> Result<Offset, SurfaceError> {
        (**self).begin_draw(update)
    }

    fn end_draw(&mut self) -> Result<(), SurfaceError> {
        (**self).end_draw()
    }

    fn clear(&mut self, color: Color) -> Result<(), SurfaceError> {
        (**self).clear(color)
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Color) -> Result<(), SurfaceError> {
        (**self).fill_rect(rect, color)
    }

    fn draw_label(&mut self, text: &str, rect: PixelRect, color: Color) -> Result<(), SurfaceError> {
        (**self).draw_label(text, rect, color)
    }

    fn trim(&mut self, keep: &[PixelRect]) -> Result<(), SurfaceError> {
        (**self).trim(keep)
    }
}

/// An open draw session
///
/// Every successful `begin` is paired with exactly one `end_draw`: either
/// through [`DrawSession::finish`], which reports the end result, or on
/// drop for early exits.
#[derive(Debug)]
pub struct DrawSession<'a, S: VirtualSurface + ?Sized> {
    surface: &'a mut S,
    update: PixelRect,
    offset: Offset,
    open: bool,
}

impl<'a, S: VirtualSurface + ?Sized> DrawSession<'a, S> {
    /// Begin drawing `update`. A failed begin leaves nothing open.
    pub fn begin(surface: &'a mut S, update: PixelRect) -> Result<Self, SurfaceError> {
        let offset = surface.begin_draw(update)?;
        Ok(Self { surface, update, offset, open: true })
    }

    pub fn update(&self) -> PixelRect {
        self.update
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Translation from surface pixels to session pixels
    pub fn delta(&self) -> (i64, i64) {
        (self.offset.x - self.update.x, self.offset.y - self.update.y)
    }

    pub fn clear(&mut self, color: Color) -> Result<(), SurfaceError> {
        self.surface.clear(color)
    }

    pub fn fill_rect(&mut self, rect: PixelRect, color: Color) -> Result<(), SurfaceError> {
        self.surface.fill_rect(rect, color)
    }

    pub fn draw_label(&mut self, text: &str, rect: PixelRect, color: Color) -> Result<(), SurfaceError> {
        self.surface.draw_label(text, rect, color)
    }

    /// End the session and report the result
    pub fn finish(mut self) -> Result<(), SurfaceError> {
        self.open = false;
        self.surface.end_draw()
    }
}

impl<S: VirtualSurface + ?Sized> Drop for DrawSession<'_, S> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            if let Err(err) = self.surface.end_draw() {
                tracing::error!(update = ?self.update, %err, "failed to end abandoned draw session");
            }
        }
    }
}
