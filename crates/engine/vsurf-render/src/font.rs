//! Label text through a system font
//!
//! A sans-serif face is looked up with fontdb and its glyph outlines are
//! turned into a single tiny-skia path per label. Surfaces without a usable
//! face fall back to [`crate::label`].

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use tiny_skia::Path;
use tracing::{debug, warn};
use ttf_parser::{Face, OutlineBuilder};

use crate::grid::PixelRect;

/// Fraction of the tile the label may occupy per axis
const MAX_WIDTH_FRACTION: f32 = 0.6;
const MAX_HEIGHT_FRACTION: f32 = 0.4;

/// Owned font face used for tile labels
pub struct LabelFont {
    data: Vec<u8>,
    index: u32,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont")
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

impl LabelFont {
    /// Load system fonts and pick a sans-serif face
    pub fn from_system() -> Option<Self> {
        let mut db = Database::new();
        db.load_system_fonts();
        let font = Self::from_database(&db);
        if font.is_none() {
            warn!(faces = db.len(), "no usable system font, labels use segment glyphs");
        }
        font
    }

    /// Pick a sans-serif face from `db`, or any face when none matches
    pub fn from_database(db: &Database) -> Option<Self> {
        let query = Query {
            families: &[Family::SansSerif],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = db.query(&query).or_else(|| db.faces().next().map(|face| face.id))?;
        let (data, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
        let font = Self::from_data(data, index)?;
        debug!(?id, ?font, "label font loaded");
        Some(font)
    }

    /// Wrap raw font file bytes; `None` when they do not parse
    pub fn from_data(data: Vec<u8>, index: u32) -> Option<Self> {
        Face::parse(&data, index).ok()?;
        Some(Self { data, index })
    }

    /// Outline `text` centred in `rect`
    ///
    /// The label is scaled uniformly to fit 60% of the width and 40% of the
    /// line height. Returns `None` when a character has no glyph, so the
    /// caller can fall back to another glyph source.
    pub fn outline(&self, text: &str, rect: PixelRect) -> Option<Path> {
        if text.is_empty() || rect.is_empty() {
            return None;
        }
        let face = Face::parse(&self.data, self.index).ok()?;

        let mut glyphs = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let id = face.glyph_index(ch)?;
            glyphs.push((id, f32::from(face.glyph_hor_advance(id).unwrap_or(0))));
        }
        let units_wide: f32 = glyphs.iter().map(|&(_, advance)| advance).sum();
        let ascender = f32::from(face.ascender());
        let units_high = ascender - f32::from(face.descender());
        if units_wide <= 0.0 || units_high <= 0.0 {
            return None;
        }

        let scale = (rect.width as f32 * MAX_WIDTH_FRACTION / units_wide)
            .min(rect.height as f32 * MAX_HEIGHT_FRACTION / units_high);
        let origin_x = rect.x as f32 + (rect.width as f32 - units_wide * scale) / 2.0;
        let top = rect.y as f32 + (rect.height as f32 - units_high * scale) / 2.0;

        let mut builder = GlyphPath::new(scale, origin_x, top + ascender * scale);
        for (id, advance) in glyphs {
            // Glyphs without an outline (spaces) still advance the pen
            let _ = face.outline_glyph(id, &mut builder);
            builder.advance(advance);
        }
        builder.finish()
    }
}

/// Converts font-unit outlines into one tiny-skia path
///
/// Font units grow upwards from the baseline; the path is in surface
/// pixels growing downwards.
struct GlyphPath {
    builder: tiny_skia::PathBuilder,
    scale: f32,
    pen_x: f32,
    baseline: f32,
}

impl GlyphPath {
    fn new(scale: f32, origin_x: f32, baseline: f32) -> Self {
        Self { builder: tiny_skia::PathBuilder::new(), scale, pen_x: origin_x, baseline }
    }

    fn advance(&mut self, units: f32) {
        self.pen_x += units * self.scale;
    }

    fn x(&self, x: f32) -> f32 {
        self.pen_x + x * self.scale
    }

    fn y(&self, y: f32) -> f32 {
        self.baseline - y * self.scale
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPath {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(self.x(x), self.y(y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(self.x(x), self.y(y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(self.x(x1), self.y(y1), self.x(x), self.y(y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder
            .cubic_to(self.x(x1), self.y(y1), self.x(x2), self.y(y2), self.x(x), self.y(y));
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
