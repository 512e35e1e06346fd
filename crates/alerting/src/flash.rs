//! Frame-driven flash duty cycle

use serde::{Deserialize, Serialize};

/// Alternating lit/dark blocks of `block_frames` frames each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashPattern {
    block_frames: u64,
}

impl FlashPattern {
    pub fn new(block_frames: u64) -> Self {
        Self {
            block_frames: block_frames.max(1),
        }
    }

    /// Whether the overlay should be lit on this frame
    pub fn is_lit(&self, frame_index: u64) -> bool {
        (frame_index / self.block_frames) % 2 == 0
    }

    pub fn block_frames(&self) -> u64 {
        self.block_frames
    }
}

impl Default for FlashPattern {
    fn default() -> Self {
        Self::new(5)
    }
}
