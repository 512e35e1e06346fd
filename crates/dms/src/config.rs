//! DMS configuration

use serde::{Deserialize, Serialize};

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// EAR below which an eye counts as closed
    pub ear_threshold: f32,

    /// Consecutive closed-eye frames before the alarm fires
    pub consecutive_frames: u32,

    /// Landmark model (OpenCV LBF, 68 points)
    pub landmark_model_path: String,

    /// Haar cascade used to find faces before fitting landmarks
    pub face_cascade_path: String,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self::study_lamp()
    }
}

impl DmsConfig {
    /// Thresholds of the combined drowsiness + emotion lamp
    pub fn study_lamp() -> Self {
        Self {
            ear_threshold: 0.23,
            consecutive_frames: 35,
            landmark_model_path: "lbfmodel.yaml".to_string(),
            face_cascade_path: "haarcascade_frontalface_default.xml".to_string(),
        }
    }

    /// Thresholds of the standalone drowsiness detector
    pub fn drowsiness_only() -> Self {
        Self {
            ear_threshold: 0.25,
            ..Self::study_lamp()
        }
    }
}
