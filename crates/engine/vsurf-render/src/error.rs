//! Error types

/// Failure reported by a virtual surface backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("graphics device removed")]
    DeviceRemoved,

    #[error("graphics device reset")]
    DeviceReset,

    #[error("surface backend failure: {0}")]
    Backend(String),

    #[error("no draw session is open")]
    NoActiveSession,

    #[error("a draw session is already open")]
    SessionActive,
}

impl SurfaceError {
    /// Device loss is transient: drawing is skipped and retried on the next update.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, SurfaceError::DeviceRemoved | SurfaceError::DeviceReset)
    }
}

/// Unrecoverable failure from the renderer or tracker
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    #[error("invalid tile configuration: {0}")]
    InvalidConfig(String),
}
