//! DMS analysis results

use camera_capture::Region;
use serde::Serialize;

use crate::ear::EarReading;
use crate::landmarks::EyeRegion;
use crate::state::{DrowsinessState, Transition};

/// Per-face result for one frame
#[derive(Debug, Clone)]
pub struct FaceReading {
    /// Face detection rectangle
    pub region: Region,
    pub left_eye: EyeRegion,
    pub right_eye: EyeRegion,
    /// `None` when an eye was degenerate and no EAR could be computed
    pub ear: Option<EarReading>,
}

/// Complete DMS analysis for one frame
#[derive(Debug, Clone, Default)]
pub struct DmsAnalysis {
    /// Faces in detection order
    pub faces: Vec<FaceReading>,

    /// State after all faces were applied
    pub state: DrowsinessState,

    /// Consecutive closed-eye frames after this frame
    pub closed_frames: u32,

    /// Transitions caused by this frame, in order
    pub transitions: Vec<Transition>,
}

impl DmsAnalysis {
    pub fn face_detected(&self) -> bool {
        !self.faces.is_empty()
    }

    pub fn is_alarm(&self) -> bool {
        self.state == DrowsinessState::Alarm
    }

    /// EAR of the last face with a valid reading
    pub fn latest_ear(&self) -> Option<EarReading> {
        self.faces.iter().rev().find_map(|f| f.ear)
    }

    /// Compact summary for structured logs
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            faces: self.faces.len(),
            state: self.state,
            closed_frames: self.closed_frames,
            ear: self.latest_ear().map(|e| e.average()),
        }
    }
}

/// Serializable summary of a [`DmsAnalysis`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub faces: usize,
    pub state: DrowsinessState,
    pub closed_frames: u32,
    pub ear: Option<f32>,
}
