//! 68-point facial landmark sets and eye regions

use camera_capture::Region;
use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Number of points in the iBUG 68-point annotation scheme
pub const LANDMARK_COUNT: usize = 68;

/// Points per eye contour
pub const EYE_POINTS: usize = 6;

/// Landmark index ranges for each eye (iBUG 68-point layout)
pub mod eye_indices {
    use std::ops::Range;

    /// Subject's left eye, right side of an unmirrored image
    pub const LEFT_EYE: Range<usize> = 42..48;
    /// Subject's right eye
    pub const RIGHT_EYE: Range<usize> = 36..42;
}

/// 2D point in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// The 68 ordered landmarks of one detected face
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Point; LANDMARK_COUNT],
}

impl LandmarkSet {
    /// Build from exactly 68 points
    pub fn from_points(points: &[Point]) -> Result<Self, DmsError> {
        let points: [Point; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| DmsError::LandmarkCount(points.len()))?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point; LANDMARK_COUNT] {
        &self.points
    }

    pub fn left_eye(&self) -> EyeRegion {
        EyeRegion::from_slice(&self.points[eye_indices::LEFT_EYE])
    }

    pub fn right_eye(&self) -> EyeRegion {
        EyeRegion::from_slice(&self.points[eye_indices::RIGHT_EYE])
    }
}

/// Six contour points of one eye.
///
/// Order: outer corner, two upper lid points, inner corner, two lower lid points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeRegion {
    pub points: [Point; EYE_POINTS],
}

impl EyeRegion {
    pub fn new(points: [Point; EYE_POINTS]) -> Self {
        Self { points }
    }

    fn from_slice(slice: &[Point]) -> Self {
        let mut points = [Point::default(); EYE_POINTS];
        points.copy_from_slice(slice);
        Self { points }
    }
}

/// One face as reported by a [`crate::LandmarkProvider`]
#[derive(Debug, Clone)]
pub struct FaceLandmarks {
    /// Detection rectangle
    pub region: Region,
    /// Fitted landmarks
    pub landmarks: LandmarkSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered() -> Vec<Point> {
        (0..LANDMARK_COUNT)
            .map(|i| Point::new(i as f32, 0.0))
            .collect()
    }

    #[test]
    fn test_eye_slices() {
        let set = LandmarkSet::from_points(&numbered()).unwrap();
        let left: Vec<f32> = set.left_eye().points.iter().map(|p| p.x).collect();
        let right: Vec<f32> = set.right_eye().points.iter().map(|p| p.x).collect();
        assert_eq!(left, vec![42.0, 43.0, 44.0, 45.0, 46.0, 47.0]);
        assert_eq!(right, vec![36.0, 37.0, 38.0, 39.0, 40.0, 41.0]);
    }

    #[test]
    fn test_wrong_landmark_count() {
        let mut points = numbered();
        points.pop();
        match LandmarkSet::from_points(&points) {
            Err(DmsError::LandmarkCount(67)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_point_distance() {
        assert_eq!(Point::new(0.0, 0.0).distance(&Point::new(3.0, 4.0)), 5.0);
    }
}
