//! Drowsiness Study Lamp - Main Entry Point

use alerting::{AlarmSound, AlertPresenter, CpalAlarm};
use anyhow::{Context, Result};
use camera_capture::OpenCvCamera;
use dms::{CascadeFaceDetector, DmsModule, LbfLandmarkProvider};
use emotion::{EmotionClassifier, EmotionSampler, OnnxEmotionClassifier};
use lamp::desktop::{CascadeFaceLocator, DisplayWindow, OverlayWindow};
use lamp::{init_logging, LampConfig, Session, Variant};
use tracing::{error, info, warn};

const OVERLAY_WIDTH: u32 = 1920;
const OVERLAY_HEIGHT: u32 = 1080;

fn main() -> Result<()> {
    let config = LampConfig::load().context("failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("=== Drowsiness Lamp v{} ({:?}) ===", env!("CARGO_PKG_VERSION"), config.variant);
    info!("Initializing...");

    let provider = LbfLandmarkProvider::new(&config.dms).map_err(|e| {
        error!("Cannot start without the landmark model: {}", e);
        e
    })?;
    let dms = DmsModule::new(&config.dms, Box::new(provider));

    let overlay = Box::new(OverlayWindow::new("Drowsiness Alert", OVERLAY_WIDTH, OVERLAY_HEIGHT));
    info!("Loading alarm sound from {}", config.alert.sound_path);
    let presenter = match CpalAlarm::load(&config.alert.sound_path) {
        Ok(sound) => AlertPresenter::new(&config.alert, Box::new(sound) as Box<dyn AlarmSound>, overlay),
        Err(e) => {
            warn!("Could not load alarm sound, alarm will be silent: {}", e);
            AlertPresenter::silent(&config.alert, overlay)
        }
    };

    let classifier = if config.emotion_enabled() {
        info!("Initializing emotion detector...");
        load_classifier(&config)
    } else {
        None
    };
    let show_lamp = config.variant == Variant::StudyLamp;

    let title = match config.variant {
        Variant::StudyLamp => "Emotion-Detecting Study Lamp",
        Variant::DrowsinessOnly => "Drowsiness Detector",
    };
    let display = DisplayWindow::new(title)?;
    let camera = OpenCvCamera::open(&config.camera)?;

    let mut session = Session::new(Box::new(camera), dms, presenter, Box::new(display));
    if show_lamp {
        session = session.with_emotion(EmotionSampler::new(config.emotion.interval), classifier);
    }

    let summary = session.run()?;
    info!(
        "Processed {} frames, {} drowsiness alarms",
        summary.frames, summary.alarms
    );
    Ok(())
}

fn load_classifier(config: &LampConfig) -> Option<Box<dyn EmotionClassifier>> {
    let locator = match CascadeFaceDetector::new(&config.emotion.cascade_path) {
        Ok(detector) => CascadeFaceLocator(detector),
        Err(e) => {
            warn!("Emotion sampling disabled: {}", e);
            return None;
        }
    };
    match OnnxEmotionClassifier::load(&config.emotion.model_path, locator) {
        Ok(classifier) => Some(Box::new(classifier)),
        Err(e) => {
            warn!("Emotion sampling disabled: {}", e);
            None
        }
    }
}
