//! Eye Aspect Ratio (EAR)
//!
//! EAR = (|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)
//!
//! Roughly 0.3 for an open eye, approaching 0 as the lids close.

use serde::{Deserialize, Serialize};

use crate::landmarks::{EyeRegion, LandmarkSet};
use crate::DmsError;

/// Compute the eye aspect ratio for one eye.
///
/// Fails with [`DmsError::DegenerateEye`] when the horizontal span is zero.
pub fn eye_aspect_ratio(eye: &EyeRegion) -> Result<f32, DmsError> {
    let p = &eye.points;
    let vertical_1 = p[1].distance(&p[5]);
    let vertical_2 = p[2].distance(&p[4]);
    let horizontal = p[0].distance(&p[3]);

    if horizontal <= f32::EPSILON {
        return Err(DmsError::DegenerateEye);
    }

    Ok((vertical_1 + vertical_2) / (2.0 * horizontal))
}

/// EAR of both eyes for one face in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarReading {
    pub left: f32,
    pub right: f32,
}

impl EarReading {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    pub fn from_landmarks(landmarks: &LandmarkSet) -> Result<Self, DmsError> {
        Ok(Self {
            left: eye_aspect_ratio(&landmarks.left_eye())?,
            right: eye_aspect_ratio(&landmarks.right_eye())?,
        })
    }

    /// Closed-eye condition: both eyes strictly below `threshold`
    pub fn both_below(&self, threshold: f32) -> bool {
        self.left < threshold && self.right < threshold
    }

    pub fn average(&self) -> f32 {
        (self.left + self.right) / 2.0
    }
}
