//! Emotion classifier seam and the FER+ ONNX backend

use camera_capture::{Region, VideoFrame};
use image::imageops::{self, FilterType};
use std::path::Path;
use tract_core::internal::{Graph, RunnableModel, TypedFact, TypedOp};
use tract_onnx::prelude::*;
use tracing::{debug, error, info};

use crate::label::Emotion;
use crate::EmotionError;

type ModelType = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// FER+ input side length
pub const FERPLUS_INPUT: u32 = 64;

/// FER+ output classes in model order
pub const FERPLUS_CLASSES: [&str; 8] = [
    "neutral",
    "happiness",
    "surprise",
    "sadness",
    "anger",
    "disgust",
    "fear",
    "contempt",
];

/// Returns the dominant emotion in a frame
pub trait EmotionClassifier {
    /// `Err(EmotionError::NoFace)` when no face is visible
    fn classify(&mut self, frame: &VideoFrame) -> Result<Emotion, EmotionError>;
}

impl<T: EmotionClassifier + ?Sized> EmotionClassifier for Box<T> {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Emotion, EmotionError> {
        (**self).classify(frame)
    }
}

/// Finds face rectangles for the classifier to crop
pub trait FaceLocator {
    fn locate(&mut self, frame: &VideoFrame) -> Result<Vec<Region>, EmotionError>;
}

/// FER+ emotion model run with tract
pub struct OnnxEmotionClassifier<L> {
    model: ModelType,
    locator: L,
}

impl<L: FaceLocator> OnnxEmotionClassifier<L> {
    /// Load a FER+ style model (1x1x64x64 grayscale in, 8 scores out)
    pub fn load(model_path: &str, locator: L) -> Result<Self, EmotionError> {
        info!("Loading emotion model from {}", model_path);
        if !Path::new(model_path).exists() {
            error!("Emotion model not found at {}", model_path);
            return Err(EmotionError::ModelLoad(format!("missing emotion model: {}", model_path)));
        }

        let side = FERPLUS_INPUT as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 1, side, side]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                error!("Failed to load emotion model: {}", e);
                EmotionError::ModelLoad(e.to_string())
            })?;

        Ok(Self { model, locator })
    }

    fn scores(&self, face: &VideoFrame) -> Result<Vec<f32>, EmotionError> {
        let gray = face.to_grayscale();
        let resized = imageops::resize(&gray, FERPLUS_INPUT, FERPLUS_INPUT, FilterType::Triangle);

        let side = FERPLUS_INPUT as usize;
        let input: Tensor = tract_ndarray::Array4::from_shape_fn((1, 1, side, side), |(_, _, y, x)| {
            resized.get_pixel(x as u32, y as u32)[0] as f32
        })
        .into();

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| EmotionError::Inference(e.to_string()))?;
        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| EmotionError::Inference(e.to_string()))?;
        Ok(view.iter().copied().collect())
    }
}

impl<L: FaceLocator> EmotionClassifier for OnnxEmotionClassifier<L> {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Emotion, EmotionError> {
        let faces = self.locator.locate(frame)?;
        let largest = faces
            .into_iter()
            .max_by_key(|r| r.area())
            .ok_or(EmotionError::NoFace)?;
        let crop = frame.crop(largest).ok_or(EmotionError::NoFace)?;

        let probabilities = softmax(&self.scores(&crop)?);
        let (index, confidence) = argmax(&probabilities)
            .ok_or_else(|| EmotionError::Inference("empty model output".into()))?;
        let label = FERPLUS_CLASSES
            .get(index)
            .ok_or_else(|| EmotionError::Inference(format!("unexpected class index {}", index)))?;

        debug!("Emotion scores {:?} -> {} ({:.2})", probabilities, label, confidence);
        Emotion::from_label(label).ok_or_else(|| EmotionError::UnknownLabel(label.to_string()))
    }
}

/// Numerically stable softmax
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; scores.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the largest element
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}
