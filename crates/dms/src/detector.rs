//! OpenCV face detection and landmark fitting

use camera_capture::webcam::gray_to_mat;
use camera_capture::Region;
use image::GrayImage;
use opencv::core::{Point2f, Ptr, Rect, Size, Vector};
use opencv::face::{self, Facemark};
use opencv::objdetect::{self, CascadeClassifier};
use opencv::prelude::*;
use std::path::Path;
use tracing::{error, info};

use crate::landmarks::{FaceLandmarks, LandmarkSet, Point};
use crate::{DmsConfig, DmsError, LandmarkProvider};

/// Frontal face detector using a Haar cascade
pub struct CascadeFaceDetector {
    classifier: CascadeClassifier,
}

impl CascadeFaceDetector {
    pub fn new(cascade_path: &str) -> Result<Self, DmsError> {
        if !Path::new(cascade_path).exists() {
            error!("Face cascade not found at {}", cascade_path);
            return Err(DmsError::ModelLoad(format!("missing face cascade: {}", cascade_path)));
        }
        let classifier = CascadeClassifier::new(cascade_path).map_err(|e| {
            error!("Failed to load face cascade: {}", e);
            DmsError::ModelLoad(e.to_string())
        })?;
        Ok(Self { classifier })
    }

    /// Detect faces in a grayscale image
    pub fn detect(&mut self, gray: &GrayImage) -> Result<Vec<Region>, DmsError> {
        let rects = self.detect_rects(gray)?;
        Ok(rects
            .iter()
            .filter_map(|r| Region::clipped(r.x, r.y, r.width, r.height, gray.width(), gray.height()))
            .collect())
    }

    fn detect_rects(&mut self, gray: &GrayImage) -> Result<Vector<Rect>, DmsError> {
        let mat = gray_to_mat(gray).map_err(|e| DmsError::Detection(e.to_string()))?;
        let mut faces = Vector::<Rect>::new();
        self.classifier
            .detect_multi_scale(
                &mat,
                &mut faces,
                1.1,
                5,
                objdetect::CASCADE_SCALE_IMAGE,
                Size::new(30, 30),
                Size::new(0, 0),
            )
            .map_err(|e| DmsError::Detection(e.to_string()))?;
        Ok(faces)
    }
}

/// 68-point landmark provider: Haar cascade for faces, LBF for landmarks
pub struct LbfLandmarkProvider {
    faces: CascadeFaceDetector,
    facemark: Ptr<Facemark>,
}

impl LbfLandmarkProvider {
    /// Load both models. A missing landmark model is fatal.
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        info!("Loading facial landmark predictor from {}", config.landmark_model_path);
        if !Path::new(&config.landmark_model_path).exists() {
            error!("Landmark model not found at {}", config.landmark_model_path);
            return Err(DmsError::ModelLoad(format!(
                "missing landmark model: {}",
                config.landmark_model_path
            )));
        }

        let mut facemark = face::create_facemark_lbf().map_err(|e| {
            error!("Failed to create landmark fitter: {}", e);
            DmsError::ModelLoad(e.to_string())
        })?;
        facemark
            .load_model(&config.landmark_model_path)
            .map_err(|e| {
                error!("Failed to load landmark model: {}", e);
                DmsError::ModelLoad(e.to_string())
            })?;

        Ok(Self {
            faces: CascadeFaceDetector::new(&config.face_cascade_path)?,
            facemark,
        })
    }
}

impl LandmarkProvider for LbfLandmarkProvider {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceLandmarks>, DmsError> {
        let rects = self.faces.detect_rects(gray)?;
        if rects.is_empty() {
            return Ok(Vec::new());
        }

        let mat = gray_to_mat(gray).map_err(|e| DmsError::Detection(e.to_string()))?;
        let mut fitted = Vector::<Vector<Point2f>>::new();
        let ok = self
            .facemark
            .fit(&mat, &rects, &mut fitted)
            .map_err(|e| DmsError::Detection(e.to_string()))?;
        if !ok {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(fitted.len());
        for (rect, shape) in rects.iter().zip(fitted.iter()) {
            let Some(region) =
                Region::clipped(rect.x, rect.y, rect.width, rect.height, gray.width(), gray.height())
            else {
                continue;
            };
            let points: Vec<Point> = shape.iter().map(|p| Point::new(p.x, p.y)).collect();
            out.push(FaceLandmarks {
                region,
                landmarks: LandmarkSet::from_points(&points)?,
            });
        }
        Ok(out)
    }
}
