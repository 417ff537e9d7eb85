//! CPU reference surface backed by tiny-skia
//!
//! Content lives in sparse square chunks keyed by chunk row/column, so a
//! million-pixel-wide surface only costs memory for what has been drawn.
//! A draw session renders into its own pixmap, which is copied into the
//! chunks it overlaps on `end_draw`. Trimming drops whole chunks.
//! Labels are filled from a font outline when a face is available and from
//! segment glyphs otherwise.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use tiny_skia::{BlendMode, FillRule, Paint, Pixmap, PixmapPaint, Rect, Transform};
use tracing::{debug, info, warn};

use crate::font::LabelFont;
use crate::grid::PixelRect;
use crate::surface::{Offset, VirtualSurface};
use crate::{label, Color, SurfaceError, TileConfig};

struct Session {
    update: PixelRect,
    pixmap: Pixmap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DeviceState {
    Ready,
    Lost(SurfaceError),
}

/// Sparse raster virtual surface
pub struct RasterSurface {
    chunk_size: u32,
    extent: i64,
    chunks: HashMap<(i64, i64), Pixmap>,
    session: Option<Session>,
    device: DeviceState,
    font: Option<LabelFont>,
}

impl fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterSurface")
            .field("chunk_size", &self.chunk_size)
            .field("extent", &self.extent)
            .field("chunks", &self.chunks.len())
            .field("session", &self.session.as_ref().map(|s| s.update))
            .field("device", &self.device)
            .field("font", &self.font)
            .finish()
    }
}

impl RasterSurface {
    /// Create a surface `extent` pixels square, stored in `chunk_size` chunks
    ///
    /// No font is attached; labels use segment glyphs until
    /// [`RasterSurface::with_font`] supplies one.
    pub fn new(chunk_size: u32, extent: i64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            extent,
            chunks: HashMap::new(),
            session: None,
            device: DeviceState::Ready,
            font: None,
        }
    }

    /// One chunk per tile, sized to the configured surface, labelled with a
    /// system font when one is installed
    pub fn from_config(config: &TileConfig) -> Self {
        let surface = Self::new(config.tile_size, config.surface_extent());
        match LabelFont::from_system() {
            Some(font) => surface.with_font(font),
            None => surface,
        }
    }

    pub fn with_font(mut self, font: LabelFont) -> Self {
        self.font = Some(font);
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Number of chunks holding content
    pub fn resident_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Bytes of pixel storage held by resident chunks
    pub fn resident_bytes(&self) -> usize {
        self.chunks.values().map(|chunk| chunk.data().len()).sum()
    }

    pub fn is_device_lost(&self) -> bool {
        matches!(self.device, DeviceState::Lost(_))
    }

    /// Simulate losing the graphics device
    ///
    /// Subsequent `begin_draw` calls and the `end_draw` of an open session
    /// report `kind` until [`RasterSurface::recreate_device`] is called.
    pub fn lose_device(&mut self, kind: SurfaceError) {
        warn!(%kind, "graphics device lost");
        self.device = DeviceState::Lost(kind);
    }

    /// Bring the device back. Content does not survive device loss.
    pub fn recreate_device(&mut self) {
        info!(discarded = self.chunks.len(), "recreating graphics device");
        self.chunks.clear();
        self.session = None;
        self.device = DeviceState::Ready;
    }

    /// Straight-alpha pixel at a surface position, `None` when not resident
    pub fn pixel(&self, x: i64, y: i64) -> Option<Color> {
        let size = i64::from(self.chunk_size);
        let key = (y.div_euclid(size), x.div_euclid(size));
        let chunk = self.chunks.get(&key)?;
        let pixel = chunk.pixel(x.rem_euclid(size) as u32, y.rem_euclid(size) as u32)?;
        let c = pixel.demultiply();
        Some(Color::rgba(c.red(), c.green(), c.blue(), c.alpha()))
    }

    /// Copy a region of the surface. Non-resident areas are transparent.
    pub fn snapshot(&self, rect: PixelRect) -> Result<Pixmap, SurfaceError> {
        let mut out = new_pixmap(rect.width, rect.height)?;
        let paint = source_paint();
        for key in self.chunk_keys(rect) {
            if let Some(chunk) = self.chunks.get(&key) {
                let origin = self.chunk_rect(key);
                out.draw_pixmap(
                    (origin.x - rect.x) as i32,
                    (origin.y - rect.y) as i32,
                    chunk.as_ref(),
                    &paint,
                    Transform::identity(),
                    None,
                );
            }
        }
        Ok(out)
    }

    fn chunk_rect(&self, (row, column): (i64, i64)) -> PixelRect {
        let size = i64::from(self.chunk_size);
        PixelRect::new(column * size, row * size, size, size)
    }

    /// Keys of every chunk overlapping `rect`
    fn chunk_keys(&self, rect: PixelRect) -> impl Iterator<Item = (i64, i64)> + use<> {
        let size = i64::from(self.chunk_size);
        let (first_row, first_column) = (rect.y.div_euclid(size), rect.x.div_euclid(size));
        let (last_row, last_column) = if rect.is_empty() {
            (first_row - 1, first_column - 1)
        } else {
            ((rect.bottom() - 1).div_euclid(size), (rect.right() - 1).div_euclid(size))
        };
        (first_row..=last_row).flat_map(move |row| (first_column..=last_column).map(move |column| (row, column)))
    }

    fn session_mut(&mut self) -> Result<&mut Session, SurfaceError> {
        self.session.as_mut().ok_or(SurfaceError::NoActiveSession)
    }
}

fn new_pixmap(width: i64, height: i64) -> Result<Pixmap, SurfaceError> {
    let dims = u32::try_from(width).ok().zip(u32::try_from(height).ok());
    dims.and_then(|(w, h)| Pixmap::new(w, h))
        .ok_or_else(|| SurfaceError::Backend(format!("cannot allocate {width}x{height} pixmap")))
}

fn source_paint() -> PixmapPaint {
    PixmapPaint { blend_mode: BlendMode::Source, ..PixmapPaint::default() }
}

fn solid_paint(color: Color, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = anti_alias;
    paint
}

impl VirtualSurface for RasterSurface {
    fn extent(&self) -> i64 {
        self.extent
    }

    fn begin_draw(&mut self, update: PixelRect) -> Result<Offset, SurfaceError> {
        if self.session.is_some() {
            return Err(SurfaceError::SessionActive);
        }
        if let DeviceState::Lost(kind) = &self.device {
            return Err(kind.clone());
        }
        let bounds = PixelRect::new(0, 0, self.extent, self.extent);
        if update.is_empty() || !bounds.contains(&update) {
            return Err(SurfaceError::Backend(format!("update {update:?} outside surface")));
        }
        let pixmap = new_pixmap(update.width, update.height)?;
        self.session = Some(Session { update, pixmap });
        Ok(Offset::new(0, 0))
    }

    fn end_draw(&mut self) -> Result<(), SurfaceError> {
        let session = self.session.take().ok_or(SurfaceError::NoActiveSession)?;
        if let DeviceState::Lost(kind) = &self.device {
            return Err(kind.clone());
        }

        let paint = source_paint();
        let update = session.update;
        let mut touched = 0usize;
        for key in self.chunk_keys(update) {
            let origin = self.chunk_rect(key);
            let chunk = match self.chunks.entry(key) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    entry.insert(new_pixmap(origin.width, origin.height)?)
                }
            };
            chunk.draw_pixmap(
                (update.x - origin.x) as i32,
                (update.y - origin.y) as i32,
                session.pixmap.as_ref(),
                &paint,
                Transform::identity(),
                None,
            );
            touched += 1;
        }
        debug!(?update, touched, "committed draw session");
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<(), SurfaceError> {
        self.session_mut()?.pixmap.fill(color.to_skia());
        Ok(())
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Color) -> Result<(), SurfaceError> {
        let session = self.session_mut()?;
        if let Some(rect) = Rect::from_xywh(rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32) {
            session.pixmap.fill_rect(rect, &solid_paint(color, false), Transform::identity(), None);
        }
        Ok(())
    }

    fn draw_label(&mut self, text: &str, rect: PixelRect, color: Color) -> Result<(), SurfaceError> {
        let outline = self.font.as_ref().and_then(|font| font.outline(text, rect));
        let session = self.session_mut()?;
        let paint = solid_paint(color, true);
        if let Some(path) = outline {
            session.pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            return Ok(());
        }
        for bar in label::layout(text, rect) {
            if let Some(bar) = Rect::from_xywh(bar.x, bar.y, bar.width, bar.height) {
                session.pixmap.fill_rect(bar, &paint, Transform::identity(), None);
            }
        }
        Ok(())
    }

    fn trim(&mut self, keep: &[PixelRect]) -> Result<(), SurfaceError> {
        if self.session.is_some() {
            return Err(SurfaceError::SessionActive);
        }
        let size = i64::from(self.chunk_size);
        let before = self.chunks.len();
        self.chunks.retain(|&(row, column), _| {
            let chunk = PixelRect::new(column * size, row * size, size, size);
            keep.iter().any(|rect| rect.intersects(&chunk))
        });
        debug!(dropped = before - self.chunks.len(), kept = self.chunks.len(), "trimmed surface");
        Ok(())
    }
}
