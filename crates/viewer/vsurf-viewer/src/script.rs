//! Interaction scripts

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vsurf_render::{InteractionConfig, TileConfig};

/// One scripted interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Resize { width: f64, height: f64 },
    Pan { dx: f64, dy: f64 },
    ScrollTo { x: f64, y: f64 },
    Zoom { scale: f64 },
    Idle,
    LoseDevice {
        #[serde(default)]
        reset: bool,
    },
    RecreateDevice,
}

/// Configuration plus the steps to replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub tiles: TileConfig,
    pub interaction: InteractionConfig,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid script {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Built-in walk over the surface
    pub fn demo() -> Self {
        use Step::*;
        Self {
            tiles: TileConfig::default(),
            interaction: InteractionConfig::default(),
            steps: vec![
                Resize { width: 800.0, height: 600.0 },
                Pan { dx: 100.0, dy: 0.0 },
                Pan { dx: 250.0, dy: 130.0 },
                Pan { dx: -40.0, dy: 20.0 },
                Zoom { scale: 0.5 },
                Pan { dx: 60.0, dy: 60.0 },
                Idle,
                LoseDevice { reset: false },
                Pan { dx: 0.0, dy: 300.0 },
                RecreateDevice,
                Pan { dx: 0.0, dy: 0.0 },
                ScrollTo { x: 25_000.0, y: 12_000.0 },
                Zoom { scale: 1.0 },
                Idle,
            ],
        }
    }
}
