//! Layered lamp configuration

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use config::{Config, Environment, File};
use dms::DmsConfig;
use emotion::DEFAULT_INTERVAL;
use serde::{Deserialize, Serialize};

use crate::LampError;

/// Which program the lamp runs as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Drowsiness alarm plus emotion-coloured swatch
    #[default]
    StudyLamp,
    /// Drowsiness alarm only, with a looser EAR threshold
    DrowsinessOnly,
}

/// Emotion sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    pub enabled: bool,
    /// Frames between classifier runs
    pub interval: u64,
    pub model_path: String,
    /// Cascade used to crop the face fed to the classifier
    pub cascade_path: String,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_INTERVAL,
            model_path: "emotion-ferplus-8.onnx".to_string(),
            cascade_path: "haarcascade_frontalface_default.xml".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LampConfig {
    pub variant: Variant,
    pub camera: CameraConfig,
    pub dms: DmsConfig,
    pub emotion: EmotionConfig,
    pub alert: AlertConfig,
    pub logging: LoggingConfig,
}

impl LampConfig {
    /// Defaults for a variant
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::StudyLamp => Self::default(),
            Variant::DrowsinessOnly => Self {
                variant,
                dms: DmsConfig::drowsiness_only(),
                emotion: EmotionConfig {
                    enabled: false,
                    ..EmotionConfig::default()
                },
                ..Self::default()
            },
        }
    }

    /// Load `lamp.toml` (optional) and `LAMP__*` environment overrides
    pub fn load() -> Result<Self, LampError> {
        Self::load_from("lamp")
    }

    /// Load from a config file basename, then the environment.
    ///
    /// The variant is resolved first so its presets sit under any
    /// explicit overrides.
    pub fn load_from(basename: &str) -> Result<Self, LampError> {
        let variant = Self::layered(basename, Config::builder())?
            .get::<Variant>("variant")
            .unwrap_or_default();

        let defaults = Config::try_from(&Self::for_variant(variant))?;
        let config: LampConfig = Self::layered(basename, Config::builder().add_source(defaults))?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn layered(
        basename: &str,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Config, LampError> {
        Ok(builder
            .add_source(File::with_name(basename).required(false))
            .add_source(
                Environment::with_prefix("LAMP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?)
    }

    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<(), LampError> {
        if self.emotion.interval == 0 {
            return Err(LampError::Config("emotion.interval must be at least 1".into()));
        }
        if self.dms.consecutive_frames == 0 {
            return Err(LampError::Config("dms.consecutive_frames must be at least 1".into()));
        }
        if self.dms.ear_threshold.is_nan() || self.dms.ear_threshold <= 0.0 {
            return Err(LampError::Config(format!(
                "dms.ear_threshold must be positive, got {}",
                self.dms.ear_threshold
            )));
        }
        if self.alert.flash_block_frames == 0 {
            return Err(LampError::Config("alert.flash_block_frames must be at least 1".into()));
        }
        Ok(())
    }

    /// Whether emotion sampling should run at all
    pub fn emotion_enabled(&self) -> bool {
        self.variant == Variant::StudyLamp && self.emotion.enabled
    }
}
