pub type CanvasResult<T> = Result<T, CanvasError>;

/// Every failure the canvas core can report. All of them are recoverable:
/// the attempted mutation is abandoned and surface + history stay as they were.
#[derive(thiserror::Error, Debug)]
pub enum CanvasError {
    #[error("canvas is not initialized")]
    NotInitialized,

    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("snapshot is {snapshot_width}x{snapshot_height} but surface is {surface_width}x{surface_height}")]
    DimensionMismatch {
        snapshot_width: u32,
        snapshot_height: u32,
        surface_width: u32,
        surface_height: u32,
    },

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("invalid image data: {0}")]
    InvalidImageData(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("another generation is still in progress")]
    Busy,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CanvasError {
    pub fn unknown_filter(name: impl Into<String>) -> Self {
        Self::UnknownFilter(name.into())
    }

    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImageData(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }
}

impl From<image::ImageError> for CanvasError {
    fn from(e: image::ImageError) -> Self {
        CanvasError::InvalidImageData(e.to_string())
    }
}
