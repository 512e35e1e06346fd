//! OpenCV webcam backend and Mat conversions

use image::GrayImage;
use opencv::core::{self, Mat, Scalar};
use opencv::prelude::*;
use opencv::{imgproc, videoio};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{CameraConfig, CameraError, FrameSource, VideoFrame};

/// Default system camera read through `cv::VideoCapture`
pub struct OpenCvCamera {
    capture: videoio::VideoCapture,
    sequence: u64,
    released: bool,
}

impl OpenCvCamera {
    /// Open the camera at `config.index`
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        info!("Starting video stream on camera {}", config.index);
        let mut capture = videoio::VideoCapture::new(config.index, videoio::CAP_ANY)
            .map_err(|e| CameraError::Open(e.to_string()))?;

        let opened = capture
            .is_opened()
            .map_err(|e| CameraError::Open(e.to_string()))?;
        if !opened {
            return Err(CameraError::Open(format!(
                "camera {} could not be opened",
                config.index
            )));
        }

        if config.width > 0 && config.height > 0 {
            capture
                .set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)
                .map_err(|e| CameraError::Format(e.to_string()))?;
            capture
                .set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)
                .map_err(|e| CameraError::Format(e.to_string()))?;
        }

        // Sensors need a moment to settle exposure
        std::thread::sleep(Duration::from_millis(config.warmup_ms));

        Ok(Self {
            capture,
            sequence: 0,
            released: false,
        })
    }
}

impl FrameSource for OpenCvCamera {
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.released {
            return Ok(None);
        }

        let mut bgr = Mat::default();
        let ok = self
            .capture
            .read(&mut bgr)
            .map_err(|e| CameraError::Stream(e.to_string()))?;
        if !ok || bgr.empty() {
            debug!("Camera returned no frame");
            return Ok(None);
        }

        let frame = mat_to_frame(&bgr, self.sequence)?;
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.capture.release() {
            warn!("Failed to release camera: {}", e);
        }
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        self.release();
    }
}

/// Convert a BGR `Mat` into an RGB [`VideoFrame`]
pub fn mat_to_frame(bgr: &Mat, sequence: u64) -> Result<VideoFrame, CameraError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
        .map_err(|e| CameraError::Format(e.to_string()))?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb
        .data_bytes()
        .map_err(|e| CameraError::Format(e.to_string()))?
        .to_vec();

    Ok(VideoFrame::new(data, width, height, sequence))
}

/// Convert an RGB [`VideoFrame`] into a BGR `Mat` for display
pub fn frame_to_mat(frame: &VideoFrame) -> Result<Mat, CameraError> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height as i32,
        frame.width as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )
    .map_err(|e| CameraError::Format(e.to_string()))?;
    copy_into(&mut rgb, &frame.data)?;

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)
        .map_err(|e| CameraError::Format(e.to_string()))?;
    Ok(bgr)
}

/// Convert a grayscale image into a single channel `Mat`
pub fn gray_to_mat(gray: &GrayImage) -> Result<Mat, CameraError> {
    let mut mat = Mat::new_rows_cols_with_default(
        gray.height() as i32,
        gray.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )
    .map_err(|e| CameraError::Format(e.to_string()))?;
    copy_into(&mut mat, gray.as_raw())?;
    Ok(mat)
}

fn copy_into(mat: &mut Mat, bytes: &[u8]) -> Result<(), CameraError> {
    let dst = mat
        .data_bytes_mut()
        .map_err(|e| CameraError::Format(e.to_string()))?;
    if dst.len() != bytes.len() {
        return Err(CameraError::Format(format!(
            "buffer size mismatch: mat {} bytes, frame {} bytes",
            dst.len(),
            bytes.len()
        )));
    }
    dst.copy_from_slice(bytes);
    Ok(())
}
