//! Fallback tile label glyphs
//!
//! Used when no font face is available. Labels are "row,column" strings, so
//! the only glyphs needed are digits, '-' and ','. They are laid out as
//! seven-segment bars.

use crate::grid::PixelRect;

/// Glyph cell height in layout units
const CELL_HEIGHT: f32 = 7.0;
/// Gap between glyphs in layout units
const SPACING: f32 = 1.0;
/// Fraction of the tile the label may occupy per axis
const MAX_WIDTH_FRACTION: f32 = 0.6;
const MAX_HEIGHT_FRACTION: f32 = 0.4;

// Segment bits: a (top), b (upper right), c (lower right), d (bottom),
// e (lower left), f (upper left), g (middle)
const A: u8 = 1 << 0;
const B: u8 = 1 << 1;
const C: u8 = 1 << 2;
const D: u8 = 1 << 3;
const E: u8 = 1 << 4;
const F: u8 = 1 << 5;
const G: u8 = 1 << 6;

const DIGITS: [u8; 10] = [
    A | B | C | D | E | F,
    B | C,
    A | B | G | E | D,
    A | B | G | C | D,
    F | G | B | C,
    A | F | G | C | D,
    A | F | G | E | C | D,
    A | B | C,
    A | B | C | D | E | F | G,
    A | B | C | D | F | G,
];

/// (bit, x, y, width, height) in units of a 4x7 cell
const SEGMENTS: [(u8, f32, f32, f32, f32); 7] = [
    (A, 0.0, 0.0, 4.0, 1.0),
    (B, 3.0, 0.0, 1.0, 4.0),
    (C, 3.0, 3.0, 1.0, 4.0),
    (D, 0.0, 6.0, 4.0, 1.0),
    (E, 0.0, 3.0, 1.0, 4.0),
    (F, 0.0, 0.0, 1.0, 4.0),
    (G, 0.0, 3.0, 4.0, 1.0),
];

/// Filled bar of a laid-out label, in the same space as the target rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

enum Glyph {
    Segments(u8),
    Comma,
    Blank,
}

impl Glyph {
    fn of(ch: char) -> Self {
        match ch {
            '0'..='9' => Glyph::Segments(DIGITS[ch as usize - '0' as usize]),
            '-' => Glyph::Segments(G),
            ',' => Glyph::Comma,
            _ => Glyph::Blank,
        }
    }

    fn advance(&self) -> f32 {
        match self {
            Glyph::Comma => 1.0,
            _ => 4.0,
        }
    }
}

/// Lay out `text` centred in `rect`
///
/// The label is scaled uniformly to fit 60% of the width and 40% of the
/// height. Characters without a glyph leave a blank cell.
pub fn layout(text: &str, rect: PixelRect) -> Vec<Bar> {
    let glyphs: Vec<Glyph> = text.chars().map(Glyph::of).collect();
    if glyphs.is_empty() || rect.is_empty() {
        return Vec::new();
    }

    let units_wide: f32 =
        glyphs.iter().map(Glyph::advance).sum::<f32>() + SPACING * (glyphs.len() - 1) as f32;
    let scale = (rect.width as f32 * MAX_WIDTH_FRACTION / units_wide)
        .min(rect.height as f32 * MAX_HEIGHT_FRACTION / CELL_HEIGHT);

    let origin_x = rect.x as f32 + (rect.width as f32 - units_wide * scale) / 2.0;
    let origin_y = rect.y as f32 + (rect.height as f32 - CELL_HEIGHT * scale) / 2.0;

    let mut bars = Vec::new();
    let mut pen = 0.0;
    for glyph in &glyphs {
        let mut push = |x: f32, y: f32, width: f32, height: f32| {
            bars.push(Bar {
                x: origin_x + (pen + x) * scale,
                y: origin_y + y * scale,
                width: width * scale,
                height: height * scale,
            });
        };
        match glyph {
            Glyph::Segments(bits) => {
                for &(bit, x, y, w, h) in &SEGMENTS {
                    if bits & bit != 0 {
                        push(x, y, w, h);
                    }
                }
            }
            Glyph::Comma => push(0.0, 5.0, 1.0, 2.0),
            Glyph::Blank => {}
        }
        pen += glyph.advance() + SPACING;
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(bars: &[Bar]) -> (f32, f32, f32, f32) {
        let left = bars.iter().map(|b| b.x).fold(f32::MAX, f32::min);
        let top = bars.iter().map(|b| b.y).fold(f32::MAX, f32::min);
        let right = bars.iter().map(|b| b.x + b.width).fold(f32::MIN, f32::max);
        let bottom = bars.iter().map(|b| b.y + b.height).fold(f32::MIN, f32::max);
        (left, top, right, bottom)
    }

    #[test]
    fn test_segment_counts() {
        let rect = PixelRect::new(0, 0, 100, 100);
        assert_eq!(layout("8", rect).len(), 7);
        assert_eq!(layout("1", rect).len(), 2);
        assert_eq!(layout("-", rect).len(), 1);
        // 0 (6) + comma (1) + 7 (3)
        assert_eq!(layout("0,7", rect).len(), 10);
    }

    #[test]
    fn test_label_fits_and_centres() {
        let rect = PixelRect::new(300, 200, 100, 100);
        let bars = layout("20,38", rect);
        let (left, top, right, bottom) = bounds(&bars);
        assert!(left >= 300.0 && right <= 400.0);
        assert!(top >= 200.0 && bottom <= 300.0);
        assert!(right - left <= 60.0 + 1e-3);
        assert!(bottom - top <= 40.0 + 1e-3);
        // Horizontally centred
        assert!(((left - 300.0) - (400.0 - right)).abs() < 1e-3);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(layout("", PixelRect::new(0, 0, 100, 100)).is_empty());
        assert!(layout("1,2", PixelRect::new(0, 0, 0, 100)).is_empty());
    }

    #[test]
    fn test_unknown_chars_are_blank() {
        let rect = PixelRect::new(0, 0, 100, 100);
        assert!(layout("x", rect).is_empty());
        assert_eq!(layout("1x1", rect).len(), 4);
    }
}
