//! Video frame types and processing

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a region from signed detector output, clipped to the frame
    pub fn clipped(x: i32, y: i32, width: i32, height: i32, frame_w: u32, frame_h: u32) -> Option<Self> {
        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = (x.saturating_add(width)).clamp(0, frame_w as i32) as u32;
        let y1 = (y.saturating_add(height)).clamp(0, frame_h as i32) as u32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame sequence number
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    /// Create a frame filled with a single colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(data, width, height, sequence)
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data.get(idx..idx + 3).map(|p| [p[0], p[1], p[2]])
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayImage {
        let mut gray = Vec::with_capacity((self.width * self.height) as usize);
        for pixel in self.data.chunks_exact(3) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let y = (pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114) as u8;
            gray.push(y);
        }
        ImageBuffer::<Luma<u8>, _>::from_raw(self.width, self.height, gray)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Crop a region of the frame
    pub fn crop(&self, region: Region) -> Option<VideoFrame> {
        let Region { x, y, width: w, height: h } = region;
        if w == 0 || h == 0 || x + w > self.width || y + h > self.height {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h * 3) as usize);
        for row in y..(y + h) {
            let start = ((row * self.width + x) * 3) as usize;
            let end = start + (w * 3) as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            sequence: self.sequence,
        })
    }

    /// Run `draw` against the frame as an [`RgbImage`] and keep the result
    pub fn with_image_mut<F>(&mut self, draw: F)
    where
        F: FnOnce(&mut RgbImage),
    {
        let data = std::mem::take(&mut self.data);
        let expected = (self.width * self.height * 3) as usize;
        match RgbImage::from_raw(self.width, self.height, data) {
            Some(mut image) => {
                draw(&mut image);
                self.data = image.into_raw();
            }
            None => {
                // Malformed buffer: leave a blank frame of the right size
                self.data = vec![0; expected];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grayscale_luminance() {
        let frame = VideoFrame::filled(4, 2, [255, 255, 255], 0);
        let gray = frame.to_grayscale();
        assert_eq!(gray.dimensions(), (4, 2));
        assert!(gray.pixels().all(|p| p[0] >= 254));

        let frame = VideoFrame::filled(1, 1, [0, 255, 0], 0);
        assert_eq!(frame.to_grayscale().get_pixel(0, 0)[0], 149);
    }

    #[test]
    fn test_crop_bounds() {
        let frame = VideoFrame::filled(10, 10, [1, 2, 3], 7);
        let cropped = frame.crop(Region::new(2, 3, 4, 5)).unwrap();
        assert_eq!((cropped.width, cropped.height), (4, 5));
        assert_eq!(cropped.data.len(), 4 * 5 * 3);
        assert_eq!(cropped.sequence, 7);

        assert!(frame.crop(Region::new(8, 8, 4, 4)).is_none());
        assert!(frame.crop(Region::new(0, 0, 0, 4)).is_none());
    }

    #[test]
    fn test_region_clipping() {
        let r = Region::clipped(-5, -5, 20, 20, 10, 10).unwrap();
        assert_eq!(r, Region::new(0, 0, 10, 10));
        assert!(Region::clipped(12, 0, 5, 5, 10, 10).is_none());
        assert_eq!(Region::new(0, 0, 3, 4).area(), 12);
    }

    #[test]
    fn test_with_image_mut_round_trips_pixels() {
        let mut frame = VideoFrame::filled(3, 3, [0, 0, 0], 0);
        frame.with_image_mut(|img| img.put_pixel(1, 1, image::Rgb([9, 8, 7])));
        assert_eq!(frame.get_pixel(1, 1), Some([9, 8, 7]));
        assert_eq!(frame.get_pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(frame.get_pixel(3, 0), None);
    }

    proptest! {
        #[test]
        fn prop_clipped_region_always_crops(
            x in -50i32..80, y in -50i32..80, w in 0i32..100, h in 0i32..100,
        ) {
            let frame = VideoFrame::filled(40, 30, [5, 5, 5], 0);
            if let Some(r) = Region::clipped(x, y, w, h, frame.width, frame.height) {
                let crop = frame.crop(r);
                prop_assert!(crop.is_some());
                prop_assert_eq!(crop.map(|c| c.data.len() as u64), Some(r.area() * 3));
            }
        }
    }
}
