//! Drowsiness Study Lamp
//!
//! Wires the capture, DMS, emotion and alerting crates into a single
//! per-frame session, plus the layered configuration and logging setup
//! used by the `drowsiness-lamp` binary.

pub mod config;
#[cfg(feature = "opencv")]
pub mod desktop;
pub mod session;

pub use config::{EmotionConfig, LampConfig, LoggingConfig, Variant};
pub use session::{Display, Session, SessionSummary, StopReason};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Application error types
#[derive(Error, Debug)]
pub enum LampError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Camera error: {0}")]
    Camera(#[from] camera_capture::CameraError),

    #[error("DMS error: {0}")]
    Dms(#[from] dms::DmsError),

    #[error("Emotion error: {0}")]
    Emotion(#[from] emotion::EmotionError),

    #[error("Alert error: {0}")]
    Alert(#[from] alerting::AlertError),

    #[error("Display error: {0}")]
    Display(String),
}

impl From<::config::ConfigError> for LampError {
    fn from(e: ::config::ConfigError) -> Self {
        LampError::Config(e.to_string())
    }
}

/// Initialize logging
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LampError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LampError::Config(format!("invalid log level '{}': {}", config.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| LampError::Config(format!("failed to set tracing subscriber: {}", e)))
}
