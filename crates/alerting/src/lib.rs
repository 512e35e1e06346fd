//! Alert Presentation
//!
//! Turns drowsiness state into side effects: a looped alarm sound, a
//! full-screen flashing overlay, and annotations on the displayed frame.

pub mod annotate;
mod flash;
mod presenter;
mod sound;

pub use annotate::{annotate_frame, StatusLine};
pub use flash::FlashPattern;
pub use presenter::{AlertConfig, AlertPresenter, Overlay};
#[cfg(feature = "audio")]
pub use sound::CpalAlarm;
pub use sound::{AlarmSound, LoopSource, WavClip};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Audio unavailable: {0}")]
    Audio(String),

    #[error("Overlay failed: {0}")]
    Overlay(String),
}
