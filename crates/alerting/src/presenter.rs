//! Alert Presenter Implementation

use dms::{DrowsinessState, Transition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::flash::FlashPattern;
use crate::sound::AlarmSound;
use crate::AlertError;

/// Full-screen overlay that can be shown and hidden from the loop thread
pub trait Overlay {
    fn set_visible(&mut self, visible: bool) -> Result<(), AlertError>;

    /// Destroy the overlay window. Must be safe to call more than once.
    fn close(&mut self);
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alarm sound (WAV); missing file disables sound only
    pub sound_path: String,
    /// Frames per lit/dark block of the flashing overlay
    pub flash_block_frames: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound_path: "alarm.wav".to_string(),
            flash_block_frames: 5,
        }
    }
}

/// Drives alarm sound and flashing overlay from drowsiness state.
///
/// Sound follows transitions (started once on raise, stopped once on clear);
/// the overlay follows state and the flash pattern every frame.
pub struct AlertPresenter {
    sound: Option<Box<dyn AlarmSound>>,
    overlay: Box<dyn Overlay>,
    flash: FlashPattern,
    sound_playing: bool,
    overlay_visible: bool,
    alarms_raised: u64,
    closed: bool,
}

impl AlertPresenter {
    /// Create a presenter with sound
    pub fn new(config: &AlertConfig, sound: Box<dyn AlarmSound>, overlay: Box<dyn Overlay>) -> Self {
        Self::build(config, Some(sound), overlay)
    }

    /// Create a presenter whose alarm runs silently
    pub fn silent(config: &AlertConfig, overlay: Box<dyn Overlay>) -> Self {
        Self::build(config, None, overlay)
    }

    fn build(config: &AlertConfig, sound: Option<Box<dyn AlarmSound>>, overlay: Box<dyn Overlay>) -> Self {
        info!(
            "Creating alert presenter (sound: {}, flash block: {} frames)",
            if sound.is_some() { "on" } else { "off" },
            config.flash_block_frames
        );
        Self {
            sound,
            overlay,
            flash: FlashPattern::new(config.flash_block_frames),
            sound_playing: false,
            overlay_visible: false,
            alarms_raised: 0,
            closed: false,
        }
    }

    /// React to a drowsiness state change
    pub fn on_transition(&mut self, transition: Transition) {
        match transition {
            Transition::AlarmRaised => {
                self.alarms_raised += 1;
                warn!("Drowsiness alert! (alarm #{})", self.alarms_raised);
                self.start_sound();
            }
            Transition::AlarmCleared => {
                info!("Eyes reopened, alarm cleared");
                self.stop_sound();
            }
        }
    }

    /// Update the overlay for this frame
    pub fn present(&mut self, state: DrowsinessState, frame_index: u64) {
        if self.closed {
            return;
        }
        let visible = state == DrowsinessState::Alarm && self.flash.is_lit(frame_index);
        self.set_overlay(visible);
    }

    fn set_overlay(&mut self, visible: bool) {
        if visible == self.overlay_visible {
            return;
        }
        match self.overlay.set_visible(visible) {
            Ok(()) => self.overlay_visible = visible,
            Err(e) => warn!("Overlay update failed: {}", e),
        }
    }

    fn start_sound(&mut self) {
        if self.sound_playing {
            return;
        }
        let Some(sound) = self.sound.as_mut() else {
            debug!("No alarm sound loaded, alarm is silent");
            return;
        };
        match sound.start_loop() {
            Ok(()) => self.sound_playing = true,
            Err(e) => warn!("Failed to start alarm sound: {}", e),
        }
    }

    fn stop_sound(&mut self) {
        if !self.sound_playing {
            return;
        }
        if let Some(sound) = self.sound.as_mut() {
            if let Err(e) = sound.stop() {
                warn!("Failed to stop alarm sound: {}", e);
            }
        }
        self.sound_playing = false;
    }

    pub fn is_sound_playing(&self) -> bool {
        self.sound_playing
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Alarms raised since creation
    pub fn alarms_raised(&self) -> u64 {
        self.alarms_raised
    }

    /// Stop sound, hide and destroy the overlay, release audio
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.stop_sound();
        self.set_overlay(false);
        self.overlay.close();
        if let Some(sound) = self.sound.as_mut() {
            sound.shutdown();
        }
        self.closed = true;
        info!("Alert presenter shut down");
    }
}

impl Drop for AlertPresenter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
