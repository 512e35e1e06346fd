//! Camera Capture Library for the Drowsiness Lamp
//!
//! Provides the frame types shared by every stage of the pipeline and the
//! [`FrameSource`] seam the session loop pulls frames from.
//! Supports:
//! - Default system webcam through OpenCV (`opencv` feature)
//! - Any other producer of RGB frames implementing [`FrameSource`]

pub mod frame;
#[cfg(feature = "opencv")]
pub mod webcam;

pub use frame::{Region, VideoFrame};
#[cfg(feature = "opencv")]
pub use webcam::OpenCvCamera;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Logical device index (0 = default system camera)
    pub index: i32,
    /// Requested capture width (0 keeps the driver default)
    pub width: u32,
    /// Requested capture height (0 keeps the driver default)
    pub height: u32,
    /// Delay after opening the device before the first read (milliseconds)
    pub warmup_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 0,
            height: 0,
            warmup_ms: 1000,
        }
    }
}

/// A blocking producer of RGB frames.
///
/// `Ok(None)` marks the end of the stream; the session treats a read error
/// the same way.
pub trait FrameSource {
    /// Block until the next frame is available
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the underlying device. Must be safe to call more than once.
    fn release(&mut self) {}
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        (**self).read_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
