//! On-frame annotations: eye contours, emotion swatch, status text

use camera_capture::{Region, VideoFrame};
use dms::{DmsAnalysis, EyeRegion};
use emotion::{Emotion, Rgb};
use image::RgbImage;
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

/// Side length of the lamp colour swatch
pub const SWATCH_SIZE: u32 = 50;
/// Distance of the swatch from the top and right edges
pub const SWATCH_MARGIN: u32 = 10;

const CONTOUR_COLOR: image::Rgb<u8> = image::Rgb([0, 255, 0]);
const ALERT_COLOR: Rgb = Rgb(255, 0, 0);
const INFO_COLOR: Rgb = Rgb(0, 255, 0);

/// A line of text for the display backend to render
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub text: String,
    /// Baseline origin in pixels
    pub origin: (i32, i32),
    pub color: Rgb,
    pub scale: f64,
}

/// Top-right swatch square, if the frame is large enough
pub fn swatch_region(width: u32, height: u32) -> Option<Region> {
    let x = width.checked_sub(SWATCH_SIZE + SWATCH_MARGIN)?;
    if height < SWATCH_SIZE + SWATCH_MARGIN {
        return None;
    }
    Some(Region::new(x, SWATCH_MARGIN, SWATCH_SIZE, SWATCH_SIZE))
}

/// Closed outline through the six eye points
pub fn draw_eye_contour(image: &mut RgbImage, eye: &EyeRegion) {
    let points = &eye.points;
    for (i, start) in points.iter().enumerate() {
        let end = &points[(i + 1) % points.len()];
        draw_line_segment_mut(image, (start.x, start.y), (end.x, end.y), CONTOUR_COLOR);
    }
}

/// Filled square in the lamp colour
pub fn draw_swatch(image: &mut RgbImage, color: Rgb) {
    if let Some(r) = swatch_region(image.width(), image.height()) {
        let rect = Rect::at(r.x as i32, r.y as i32).of_size(r.width, r.height);
        draw_filled_rect_mut(image, rect, image::Rgb([color.0, color.1, color.2]));
    }
}

/// Text lines for the current frame
pub fn status_lines(alarm: bool, emotion: Option<Emotion>, ear: Option<f32>) -> Vec<StatusLine> {
    let mut lines = Vec::new();
    if alarm {
        lines.push(StatusLine {
            text: "DROWSINESS ALERT!".to_string(),
            origin: (10, 30),
            color: ALERT_COLOR,
            scale: 0.7,
        });
    }
    if let Some(emotion) = emotion {
        lines.push(StatusLine {
            text: format!("Emotion: {}", emotion),
            origin: (10, 60),
            color: INFO_COLOR,
            scale: 0.7,
        });
    }
    if let Some(ear) = ear {
        lines.push(StatusLine {
            text: format!("EAR: {:.2}", ear),
            origin: (10, 90),
            color: INFO_COLOR,
            scale: 0.6,
        });
    }
    lines
}

/// Draw eye contours and (when `emotion` is set) the lamp swatch onto
/// `frame`, returning the text lines to overlay.
pub fn annotate_frame(frame: &mut VideoFrame, analysis: &DmsAnalysis, emotion: Option<Emotion>) -> Vec<StatusLine> {
    frame.with_image_mut(|image| {
        for face in &analysis.faces {
            draw_eye_contour(image, &face.left_eye);
            draw_eye_contour(image, &face.right_eye);
        }
        if let Some(emotion) = emotion {
            draw_swatch(image, emotion.color());
        }
    });

    status_lines(
        analysis.is_alarm(),
        emotion,
        analysis.latest_ear().map(|e| e.average()),
    )
}
