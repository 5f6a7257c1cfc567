use thiserror::Error;

/// Errors surfaced by the annotation engine
#[derive(Error, Debug)]
pub enum AnnotatorError {
    /// The raster surface could not be allocated (zero or oversized dimensions)
    #[error("Unable to acquire a {width}x{height} drawing surface")]
    SurfaceUnavailable { width: u32, height: u32 },

    #[error("Stroke thickness must be positive")]
    InvalidThickness,

    #[error("Invalid color '{0}'")]
    InvalidColor(String),

    /// A segment was appended while no trace is visible
    #[error("No active trace to append a segment to")]
    NoActiveTrace,

    #[error("History index {index} is outside [-1, {last}]")]
    InvalidIndex { index: isize, last: isize },

    #[error("Failed to load background image: {0}")]
    Background(#[from] image::ImageError),

    #[error("Failed to encode surface: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize history: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to spawn encode task: {0}")]
    Spawn(#[from] futures::task::SpawnError),
}

/// Result type for annotation operations
pub type Result<T> = std::result::Result<T, AnnotatorError>;
