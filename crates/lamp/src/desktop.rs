//! OpenCV highgui windows and the cascade face locator

use alerting::{AlertError, Overlay, StatusLine};
use camera_capture::webcam::frame_to_mat;
use camera_capture::{Region, VideoFrame};
use dms::CascadeFaceDetector;
use emotion::{EmotionError, FaceLocator};
use opencv::core::{self, Mat, Point, Scalar};
use opencv::prelude::*;
use opencv::{highgui, imgproc};
use tracing::{debug, warn};

use crate::session::Display;
use crate::LampError;

/// Annotated camera window
pub struct DisplayWindow {
    name: String,
    open: bool,
}

impl DisplayWindow {
    pub fn new(name: &str) -> Result<Self, LampError> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE).map_err(display_err)?;
        Ok(Self {
            name: name.to_string(),
            open: true,
        })
    }
}

impl Display for DisplayWindow {
    fn show(&mut self, frame: &VideoFrame, lines: &[StatusLine]) -> Result<(), LampError> {
        let mut mat = frame_to_mat(frame)?;
        for line in lines {
            let [b, g, r] = line.color.to_bgr();
            imgproc::put_text(
                &mut mat,
                &line.text,
                Point::new(line.origin.0, line.origin.1),
                imgproc::FONT_HERSHEY_SIMPLEX,
                line.scale,
                Scalar::new(b as f64, g as f64, r as f64, 0.0),
                2,
                imgproc::LINE_8,
                false,
            )
            .map_err(display_err)?;
        }
        highgui::imshow(&self.name, &mat).map_err(display_err)
    }

    fn poll_key(&mut self) -> Result<Option<char>, LampError> {
        let key = highgui::wait_key(1).map_err(display_err)?;
        if key < 0 {
            return Ok(None);
        }
        Ok(char::from_u32((key & 0xFF) as u32))
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = highgui::destroy_window(&self.name) {
            debug!("Failed to destroy window {}: {}", self.name, e);
        }
    }
}

impl Drop for DisplayWindow {
    fn drop(&mut self) {
        self.close();
    }
}

/// Full-screen white flash window
pub struct OverlayWindow {
    name: String,
    width: i32,
    height: i32,
    visible: bool,
}

impl OverlayWindow {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width: width.max(1) as i32,
            height: height.max(1) as i32,
            visible: false,
        }
    }

    fn show(&self) -> opencv::Result<()> {
        highgui::named_window(&self.name, highgui::WINDOW_NORMAL)?;
        highgui::set_window_property(&self.name, highgui::WND_PROP_FULLSCREEN, highgui::WINDOW_FULLSCREEN as f64)?;
        let white = Mat::new_rows_cols_with_default(
            self.height,
            self.width,
            core::CV_8UC3,
            Scalar::all(255.0),
        )?;
        highgui::imshow(&self.name, &white)
    }
}

impl Overlay for OverlayWindow {
    fn set_visible(&mut self, visible: bool) -> Result<(), AlertError> {
        let result = if visible {
            self.show()
        } else {
            highgui::destroy_window(&self.name)
        };
        result.map_err(|e| AlertError::Overlay(e.to_string()))?;
        self.visible = visible;
        Ok(())
    }

    fn close(&mut self) {
        if !self.visible {
            return;
        }
        self.visible = false;
        if let Err(e) = highgui::destroy_window(&self.name) {
            warn!("Failed to close overlay: {}", e);
        }
    }
}

/// Feeds cascade detections to the emotion classifier
pub struct CascadeFaceLocator(pub CascadeFaceDetector);

impl FaceLocator for CascadeFaceLocator {
    fn locate(&mut self, frame: &VideoFrame) -> Result<Vec<Region>, EmotionError> {
        self.0
            .detect(&frame.to_grayscale())
            .map_err(|e| EmotionError::Inference(e.to_string()))
    }
}

fn display_err(e: opencv::Error) -> LampError {
    LampError::Display(e.to_string())
}
