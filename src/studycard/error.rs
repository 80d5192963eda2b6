use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Position {index} is out of range (list has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Rasterization failed: {0}")]
    Raster(String),

    #[error("File emission failed: {0}")]
    Emit(String),

    #[error("Rasterization timed out after {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, CardError>;
