//! Tile and Interaction Configuration

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Tile surface configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Edge length of one square tile in pixels
    pub tile_size: u32,

    /// Tiles per axis on the backing surface
    pub surface_tiles: u32,

    /// Extra tile rows/columns drawn beyond the viewport
    pub draw_ahead: u32,

    /// Largest texture dimension a single draw session may cover
    pub max_texture_dimension: u32,

    /// Safety margin subtracted from the texture limit per axis
    pub session_margin: u32,

    /// Inset applied to each tile fill, leaving gutters between tiles
    pub border_margin: u32,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_size: 100,
            surface_tiles: 10_000,
            draw_ahead: 0,
            // Lowest max texture size across supported feature levels
            max_texture_dimension: 2048,
            session_margin: 3,
            border_margin: 5,
        }
    }
}

impl TileConfig {
    /// Backing surface edge length in pixels (MaxSurfaceSize)
    pub fn surface_extent(&self) -> i64 {
        i64::from(self.tile_size) * i64::from(self.surface_tiles)
    }

    /// Largest edge of one draw session after the safety margin
    pub fn max_session_extent(&self) -> i64 {
        i64::from(self.max_texture_dimension) - i64::from(self.session_margin)
    }

    /// Reject configurations the renderer cannot honour
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.tile_size == 0 {
            return Err(RenderError::InvalidConfig("tile_size must be positive".into()));
        }
        if self.surface_tiles == 0 {
            return Err(RenderError::InvalidConfig("surface_tiles must be positive".into()));
        }
        if self.max_texture_dimension <= self.session_margin {
            return Err(RenderError::InvalidConfig(format!(
                "max_texture_dimension {} leaves no room after session_margin {}",
                self.max_texture_dimension, self.session_margin
            )));
        }
        if self.border_margin >= self.tile_size {
            return Err(RenderError::InvalidConfig(format!(
                "border_margin {} must be smaller than tile_size {}",
                self.border_margin, self.tile_size
            )));
        }
        if i32::try_from(self.surface_tiles).is_err() || i32::try_from(self.draw_ahead).is_err() {
            return Err(RenderError::InvalidConfig("tile counts exceed the index range".into()));
        }
        Ok(())
    }
}

/// Interaction limits applied by the viewport controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Smallest zoom factor
    pub min_scale: f64,

    /// Largest zoom factor
    pub max_scale: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.2,
            max_scale: 3.0,
        }
    }
}

impl InteractionConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(self.min_scale.is_finite() && self.max_scale.is_finite()) {
            return Err(RenderError::InvalidConfig("scale limits must be finite".into()));
        }
        if self.min_scale <= 0.0 || self.min_scale > self.max_scale {
            return Err(RenderError::InvalidConfig(format!(
                "scale range {}..{} is empty or non-positive",
                self.min_scale, self.max_scale
            )));
        }
        Ok(())
    }

    /// Clamp a scale into the configured range
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min_scale;
        }
        scale.clamp(self.min_scale, self.max_scale)
    }
}
