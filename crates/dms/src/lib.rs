//! Drowsiness Monitoring System (DMS)
//!
//! Per-frame driver/user state analysis from facial landmarks:
//! - Eye Aspect Ratio from the 68-point landmark layout
//! - Debounced AWAKE/ALARM state machine over consecutive frames
//! - Landmark provider seam, with an OpenCV backend behind the `opencv` feature

pub mod analysis;
pub mod config;
#[cfg(feature = "opencv")]
pub mod detector;
pub mod ear;
pub mod landmarks;
pub mod state;

pub use analysis::{AnalysisSummary, DmsAnalysis, FaceReading};
pub use config::DmsConfig;
#[cfg(feature = "opencv")]
pub use detector::{CascadeFaceDetector, LbfLandmarkProvider};
pub use ear::{eye_aspect_ratio, EarReading};
pub use landmarks::{EyeRegion, FaceLandmarks, LandmarkSet, Point};
pub use state::{DrowsinessMonitor, DrowsinessState, Transition};

use image::GrayImage;
use thiserror::Error;
use tracing::debug;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Landmark detection failed: {0}")]
    Detection(String),

    #[error("Expected 68 landmarks, got {0}")]
    LandmarkCount(usize),

    #[error("Eye region has zero width")]
    DegenerateEye,
}

/// Finds faces in a grayscale image and fits 68 landmarks to each
pub trait LandmarkProvider {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceLandmarks>, DmsError>;
}

impl<T: LandmarkProvider + ?Sized> LandmarkProvider for Box<T> {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceLandmarks>, DmsError> {
        (**self).detect(gray)
    }
}

/// Drowsiness monitoring module
pub struct DmsModule {
    provider: Box<dyn LandmarkProvider>,
    monitor: DrowsinessMonitor,
}

impl DmsModule {
    /// Create a new DMS module around a landmark provider
    pub fn new(config: &DmsConfig, provider: Box<dyn LandmarkProvider>) -> Self {
        Self {
            provider,
            monitor: DrowsinessMonitor::new(config),
        }
    }

    /// Analyze a single grayscale frame.
    ///
    /// Every detected face is fed to the state machine in detection order.
    /// A face whose EAR cannot be computed leaves the machine untouched.
    pub fn analyze(&mut self, gray: &GrayImage) -> Result<DmsAnalysis, DmsError> {
        let faces = self.provider.detect(gray)?;

        let mut readings = Vec::with_capacity(faces.len());
        let mut transitions = Vec::new();

        for face in faces {
            let ear = match EarReading::from_landmarks(&face.landmarks) {
                Ok(ear) => Some(ear),
                Err(e) => {
                    debug!("Skipping face at {:?}: {}", face.region, e);
                    None
                }
            };

            if let Some(reading) = &ear {
                if let Some(t) = self.monitor.update(reading) {
                    transitions.push(t);
                }
            }

            readings.push(FaceReading {
                region: face.region,
                left_eye: face.landmarks.left_eye(),
                right_eye: face.landmarks.right_eye(),
                ear,
            });
        }

        Ok(DmsAnalysis {
            faces: readings,
            state: self.monitor.state(),
            closed_frames: self.monitor.closed_frames(),
            transitions,
        })
    }

    pub fn monitor(&self) -> &DrowsinessMonitor {
        &self.monitor
    }

    /// Reset drowsiness state
    pub fn reset_state(&mut self) {
        self.monitor.reset();
    }
}
