//! Rate-limited emotion sampling

use camera_capture::VideoFrame;
use tracing::{debug, info};

use crate::classifier::EmotionClassifier;
use crate::label::{Emotion, Rgb};

/// Frames between classifier runs in the study lamp
pub const DEFAULT_INTERVAL: u64 = 15;

/// Runs the classifier every `interval` frames and remembers the last result.
///
/// A failed classification never replaces the last known emotion.
#[derive(Debug, Clone)]
pub struct EmotionSampler {
    interval: u64,
    last: Emotion,
    attempts: u64,
    failures: u64,
}

impl EmotionSampler {
    /// `interval` must be non-zero; zero is treated as 1
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            last: Emotion::default(),
            attempts: 0,
            failures: 0,
        }
    }

    pub fn is_sample_frame(&self, frame_index: u64) -> bool {
        frame_index % self.interval == 0
    }

    /// Possibly classify `frame`; returns the last known emotion afterwards
    pub fn sample<C>(&mut self, frame_index: u64, frame: &VideoFrame, classifier: &mut C) -> Emotion
    where
        C: EmotionClassifier + ?Sized,
    {
        if !self.is_sample_frame(frame_index) {
            return self.last;
        }

        self.attempts += 1;
        match classifier.classify(frame) {
            Ok(emotion) => {
                if emotion != self.last {
                    info!("Emotion changed: {} -> {}", self.last, emotion);
                }
                self.last = emotion;
            }
            Err(e) => {
                self.failures += 1;
                debug!("Emotion sample on frame {} kept {}: {}", frame_index, self.last, e);
            }
        }
        self.last
    }

    pub fn last(&self) -> Emotion {
        self.last
    }

    pub fn color(&self) -> Rgb {
        self.last.color()
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Classifier invocations so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Invocations that produced no result
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl Default for EmotionSampler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}
