//! Tile Grid Addressing
//!
//! Pure mapping between surface pixels and tile row/column indices for a
//! fixed tile size. Every integer index is addressable; negative indices
//! name tiles left of or above the origin.

/// Point in surface pixel space
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Divide both coordinates by a zoom factor
    pub fn unscale(self, scale: f64) -> Self {
        Self::new(self.x / scale, self.y / scale)
    }
}

/// Width/height in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn unscale(self, scale: f64) -> Self {
        Self::new(self.width / scale, self.height / scale)
    }
}

/// Integer pixel rectangle (x, y, width, height)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelRect {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge
    pub const fn right(&self) -> i64 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub const fn bottom(&self) -> i64 {
        self.y + self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Overlapping part of two rectangles, if any
    pub fn intersection(&self, other: &PixelRect) -> Option<PixelRect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(PixelRect::new(x, y, right - x, bottom - y))
    }

    pub fn contains(&self, other: &PixelRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub const fn translate(&self, dx: i64, dy: i64) -> PixelRect {
        PixelRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Shrink width and height, keeping the origin
    pub fn shrink(&self, margin: i64) -> PixelRect {
        PixelRect::new(self.x, self.y, (self.width - margin).max(0), (self.height - margin).max(0))
    }
}

/// Tile row/column index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    pub row: i32,
    pub column: i32,
}

impl TileIndex {
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }
}

/// A tile and its pixel rectangle. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub row: i32,
    pub column: i32,
    pub rect: PixelRect,
}

impl Tile {
    /// Label drawn inside the tile: "row,column"
    pub fn label(&self) -> String {
        format!("{},{}", self.row, self.column)
    }
}

/// Rectangular block of tiles starting at a column/row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileRange {
    pub start_column: i32,
    pub start_row: i32,
    pub columns: i32,
    pub rows: i32,
}

impl TileRange {
    pub const fn new(start_column: i32, start_row: i32, columns: i32, rows: i32) -> Self {
        Self { start_column, start_row, columns, rows }
    }

    pub const fn is_empty(&self) -> bool {
        self.columns <= 0 || self.rows <= 0
    }

    /// Number of tiles in the range
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.columns as usize * self.rows as usize
        }
    }

    /// Column-major walk: every row of the first column, then the next column
    pub fn indices(self) -> impl Iterator<Item = TileIndex> {
        let (start_column, start_row) = (self.start_column, self.start_row);
        let columns = self.columns.max(0);
        let rows = self.rows.max(0);
        (0..columns).flat_map(move |c| {
            (0..rows).map(move |r| TileIndex::new(start_row + r, start_column + c))
        })
    }
}

/// Inclusive tile bounds (top/bottom rows, left/right columns)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileBounds {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

impl TileBounds {
    pub const fn new(top: i32, bottom: i32, left: i32, right: i32) -> Self {
        Self { top, bottom, left, right }
    }

    pub const fn is_empty(&self) -> bool {
        self.bottom < self.top || self.right < self.left
    }

    /// The same tiles as a start/count range
    pub const fn range(&self) -> TileRange {
        TileRange::new(
            self.left,
            self.top,
            self.right - self.left + 1,
            self.bottom - self.top + 1,
        )
    }

    pub fn contains(&self, other: &TileBounds) -> bool {
        other.top >= self.top
            && other.bottom <= self.bottom
            && other.left >= self.left
            && other.right <= self.right
    }

    pub fn contains_index(&self, index: TileIndex) -> bool {
        (self.top..=self.bottom).contains(&index.row) && (self.left..=self.right).contains(&index.column)
    }

    /// Smallest bounds covering both
    pub fn union(&self, other: &TileBounds) -> TileBounds {
        TileBounds::new(
            self.top.min(other.top),
            self.bottom.max(other.bottom),
            self.left.min(other.left),
            self.right.max(other.right),
        )
    }
}

/// Tile addressing for a fixed tile size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    tile_size: u32,
}

impl TileGrid {
    /// Create a grid. `tile_size` must be positive.
    pub const fn new(tile_size: u32) -> Self {
        Self { tile_size }
    }

    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn size(&self) -> i64 {
        i64::from(self.tile_size)
    }

    /// Tile containing a pixel: `row = floor(y / size)`, `column = floor(x / size)`
    pub fn tile_index_of(&self, point: Point) -> TileIndex {
        let size = f64::from(self.tile_size);
        TileIndex::new((point.y / size).floor() as i32, (point.x / size).floor() as i32)
    }

    /// Number of tiles needed to cover `length` pixels
    pub fn tiles_to_cover(&self, length: f64) -> i32 {
        (length / f64::from(self.tile_size)).ceil() as i32
    }

    pub fn pixel_rect_of(&self, row: i32, column: i32) -> PixelRect {
        let size = self.size();
        PixelRect::new(i64::from(column) * size, i64::from(row) * size, size, size)
    }

    pub fn tile_at(&self, row: i32, column: i32) -> Tile {
        Tile { row, column, rect: self.pixel_rect_of(row, column) }
    }

    /// Union rectangle of a tile range
    pub fn pixel_rect_of_range(&self, range: TileRange) -> PixelRect {
        let size = self.size();
        PixelRect::new(
            i64::from(range.start_column) * size,
            i64::from(range.start_row) * size,
            i64::from(range.columns) * size,
            i64::from(range.rows) * size,
        )
    }

    pub fn pixel_rect_of_bounds(&self, bounds: TileBounds) -> PixelRect {
        self.pixel_rect_of_range(bounds.range())
    }

    /// Tiles for a range, column-major
    pub fn tiles_in(&self, range: TileRange) -> Vec<Tile> {
        range.indices().map(|i| self.tile_at(i.row, i.column)).collect()
    }
}
