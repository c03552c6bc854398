//! Error types for the whiteboard server

use rainboard_shared::PointLogDecodeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by persistence and rasterization. None of these ever reach
/// a connected client; callers log them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to decode point log: {0}")]
    Decode(#[from] PointLogDecodeError),

    #[error("Failed to encode point log: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Drawing of {width}x{height} pixels exceeds the surface limit")]
    SurfaceTooLarge { width: u32, height: u32 },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
