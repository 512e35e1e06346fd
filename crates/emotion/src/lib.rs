//! Emotion Sampling
//!
//! Periodic facial emotion classification for the ambient study lamp:
//! - [`EmotionSampler`] bounds classifier cost to one run per N frames
//! - [`OnnxEmotionClassifier`] runs a FER+ model with tract
//! - [`color_for_emotion`] maps the last known emotion to a lamp colour

pub mod classifier;
pub mod label;
pub mod sampler;

pub use classifier::{EmotionClassifier, FaceLocator, OnnxEmotionClassifier};
pub use label::{color_for_emotion, Emotion, Rgb, DEFAULT_COLOR};
pub use sampler::{EmotionSampler, DEFAULT_INTERVAL};

use thiserror::Error;

/// Emotion error types
#[derive(Error, Debug)]
pub enum EmotionError {
    #[error("No face detected")]
    NoFace,

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unrecognised emotion label: {0}")]
    UnknownLabel(String),
}
