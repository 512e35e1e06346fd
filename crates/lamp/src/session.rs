//! Per-frame session loop

use alerting::{annotate_frame, AlertPresenter, StatusLine};
use camera_capture::{FrameSource, VideoFrame};
use dms::{DmsAnalysis, DmsModule};
use emotion::{Emotion, EmotionClassifier, EmotionSampler};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::LampError;

/// Key that ends the session
pub const QUIT_KEY: char = 'q';

/// Window showing the annotated camera feed, and the keyboard behind it
pub trait Display {
    fn show(&mut self, frame: &VideoFrame, lines: &[StatusLine]) -> Result<(), LampError>;

    /// Non-blocking key poll
    fn poll_key(&mut self) -> Result<Option<char>, LampError>;

    /// Destroy the window. Must be safe to call more than once.
    fn close(&mut self) {}
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfStream,
    CaptureError,
    QuitKey,
}

/// Totals reported when a session ends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub alarms: u64,
    pub emotion_samples: u64,
    pub emotion_failures: u64,
    pub last_emotion: Option<Emotion>,
    pub stop_reason: StopReason,
}

/// Last known emotion, refreshed only when a classifier is loaded
struct EmotionStage {
    sampler: EmotionSampler,
    classifier: Option<Box<dyn EmotionClassifier>>,
}

/// Owns every collaborator for one run of the lamp.
///
/// Order per frame: grayscale, landmarks and EAR, state machine, emotion
/// sample, alert presentation, annotation, display, quit key.
pub struct Session {
    source: Box<dyn FrameSource>,
    dms: DmsModule,
    emotion: Option<EmotionStage>,
    presenter: AlertPresenter,
    display: Box<dyn Display>,
    frame_index: u64,
    closed: bool,
}

impl Session {
    pub fn new(
        source: Box<dyn FrameSource>,
        dms: DmsModule,
        presenter: AlertPresenter,
        display: Box<dyn Display>,
    ) -> Self {
        Self {
            source,
            dms,
            emotion: None,
            presenter,
            display,
            frame_index: 0,
            closed: false,
        }
    }

    /// Show the emotion swatch every frame.
    ///
    /// Without a classifier the swatch stays on the sampler's initial
    /// emotion (neutral).
    pub fn with_emotion(
        mut self,
        sampler: EmotionSampler,
        classifier: Option<Box<dyn EmotionClassifier>>,
    ) -> Self {
        match classifier {
            Some(_) => info!("Emotion sampling every {} frames", sampler.interval()),
            None => warn!("No emotion classifier, lamp stays {}", sampler.last()),
        }
        self.emotion = Some(EmotionStage { sampler, classifier });
        self
    }

    /// Run until end of stream, capture failure or the quit key.
    ///
    /// Resources are released before returning, on error paths too.
    pub fn run(&mut self) -> Result<SessionSummary, LampError> {
        info!("Session started");
        let result = self.run_loop();
        self.shutdown();

        let stop_reason = result?;
        let summary = self.summary(stop_reason);
        info!(
            frames = summary.frames,
            alarms = summary.alarms,
            reason = ?summary.stop_reason,
            "Session finished"
        );
        Ok(summary)
    }

    fn run_loop(&mut self) -> Result<StopReason, LampError> {
        loop {
            let frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Video stream ended after {} frames", self.frame_index);
                    return Ok(StopReason::EndOfStream);
                }
                Err(e) => {
                    warn!("Frame capture failed, stopping: {}", e);
                    return Ok(StopReason::CaptureError);
                }
            };

            if !self.step(frame)? {
                info!("Quit key pressed");
                return Ok(StopReason::QuitKey);
            }
        }
    }

    /// Process one frame; returns `false` when the user asked to quit
    pub fn step(&mut self, mut frame: VideoFrame) -> Result<bool, LampError> {
        let index = self.frame_index;
        self.frame_index += 1;

        let gray = frame.to_grayscale();
        let analysis = match self.dms.analyze(&gray) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("DMS analysis failed on frame {}: {}", index, e);
                DmsAnalysis {
                    state: self.dms.monitor().state(),
                    closed_frames: self.dms.monitor().closed_frames(),
                    ..DmsAnalysis::default()
                }
            }
        };
        debug!(frame = index, summary = ?analysis.summary(), "Frame analysed");

        let emotion = self.emotion.as_mut().map(|stage| match stage.classifier.as_mut() {
            Some(classifier) => stage.sampler.sample(index, &frame, classifier),
            None => stage.sampler.last(),
        });

        for transition in &analysis.transitions {
            self.presenter.on_transition(*transition);
        }
        // Flash phase counts frames from 1
        self.presenter.present(analysis.state, index + 1);

        let lines = annotate_frame(&mut frame, &analysis, emotion);
        self.display.show(&frame, &lines)?;

        let key = self.display.poll_key()?;
        Ok(key != Some(QUIT_KEY))
    }

    /// Frames processed so far
    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    pub fn summary(&self, stop_reason: StopReason) -> SessionSummary {
        SessionSummary {
            frames: self.frame_index,
            alarms: self.presenter.alarms_raised(),
            emotion_samples: self.emotion.as_ref().map_or(0, |s| s.sampler.attempts()),
            emotion_failures: self.emotion.as_ref().map_or(0, |s| s.sampler.failures()),
            last_emotion: self.emotion.as_ref().map(|s| s.sampler.last()),
            stop_reason,
        }
    }

    /// Stop alerts, release the camera and close windows. Idempotent.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        info!("Cleaning up");
        self.presenter.shutdown();
        self.source.release();
        self.display.close();
        self.closed = true;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlarmSound, AlertConfig, AlertError, Overlay};
    use camera_capture::{CameraError, Region};
    use dms::landmarks::{eye_indices, LANDMARK_COUNT};
    use dms::{DmsConfig, DmsError, FaceLandmarks, LandmarkProvider, LandmarkSet, Point};
    use emotion::EmotionError;
    use image::GrayImage;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        reads: usize,
        releases: usize,
        shown: Vec<Vec<String>>,
        swatch: Vec<Option<[u8; 3]>>,
        display_closes: usize,
        classify_calls: usize,
        sound_starts: usize,
        sound_stops: usize,
        overlay: Vec<bool>,
        overlay_closes: usize,
    }

    type Shared = Rc<RefCell<Log>>;

    enum Read {
        Frame,
        Fail,
    }

    struct ScriptedSource {
        log: Shared,
        script: VecDeque<Read>,
    }

    impl FrameSource for ScriptedSource {
        fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            let mut log = self.log.borrow_mut();
            let seq = log.reads as u64;
            log.reads += 1;
            match self.script.pop_front() {
                Some(Read::Frame) => Ok(Some(VideoFrame::filled(160, 120, [40, 40, 40], seq))),
                Some(Read::Fail) => Err(CameraError::Stream("unplugged".into())),
                None => Ok(None),
            }
        }

        fn release(&mut self) {
            self.log.borrow_mut().releases += 1;
        }
    }

    /// One face per frame with the scripted EAR; `None` means no face
    struct ScriptedFaces(VecDeque<Option<f32>>);

    fn face_with_ear(ear: f32) -> FaceLandmarks {
        let mut points = vec![Point::default(); LANDMARK_COUNT];
        for range in [eye_indices::LEFT_EYE, eye_indices::RIGHT_EYE] {
            let base = range.start;
            let x0 = base as f32;
            let half = ear * 30.0 / 2.0;
            points[base] = Point::new(x0, 50.0);
            points[base + 1] = Point::new(x0 + 10.0, 50.0 - half);
            points[base + 2] = Point::new(x0 + 20.0, 50.0 - half);
            points[base + 3] = Point::new(x0 + 30.0, 50.0);
            points[base + 4] = Point::new(x0 + 20.0, 50.0 + half);
            points[base + 5] = Point::new(x0 + 10.0, 50.0 + half);
        }
        FaceLandmarks {
            region: Region::new(20, 20, 100, 90),
            landmarks: LandmarkSet::from_points(&points).unwrap(),
        }
    }

    impl LandmarkProvider for ScriptedFaces {
        fn detect(&mut self, _gray: &GrayImage) -> Result<Vec<FaceLandmarks>, DmsError> {
            Ok(self.0.pop_front().flatten().map(face_with_ear).into_iter().collect())
        }
    }

    struct CountingClassifier(Shared);

    impl EmotionClassifier for CountingClassifier {
        fn classify(&mut self, _frame: &VideoFrame) -> Result<Emotion, EmotionError> {
            let mut log = self.0.borrow_mut();
            log.classify_calls += 1;
            if log.classify_calls == 2 {
                Err(EmotionError::NoFace)
            } else {
                Ok(Emotion::Happy)
            }
        }
    }

    struct RecordingSound(Shared);

    impl AlarmSound for RecordingSound {
        fn start_loop(&mut self) -> Result<(), AlertError> {
            self.0.borrow_mut().sound_starts += 1;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), AlertError> {
            self.0.borrow_mut().sound_stops += 1;
            Ok(())
        }
    }

    struct RecordingOverlay(Shared);

    impl Overlay for RecordingOverlay {
        fn set_visible(&mut self, visible: bool) -> Result<(), AlertError> {
            self.0.borrow_mut().overlay.push(visible);
            Ok(())
        }

        fn close(&mut self) {
            self.0.borrow_mut().overlay_closes += 1;
        }
    }

    struct RecordingDisplay {
        log: Shared,
        quit_after: Option<usize>,
        quit_key: char,
        fail: bool,
    }

    /// Inside the 50x50 swatch of a 160x120 frame
    const SWATCH_PIXEL: (u32, u32) = (130, 20);

    impl Display for RecordingDisplay {
        fn show(&mut self, frame: &VideoFrame, lines: &[StatusLine]) -> Result<(), LampError> {
            if self.fail {
                return Err(LampError::Display("window gone".into()));
            }
            let mut log = self.log.borrow_mut();
            log.shown.push(lines.iter().map(|l| l.text.clone()).collect());
            log.swatch.push(frame.get_pixel(SWATCH_PIXEL.0, SWATCH_PIXEL.1));
            Ok(())
        }

        fn poll_key(&mut self) -> Result<Option<char>, LampError> {
            let shown = self.log.borrow().shown.len();
            Ok(match self.quit_after {
                Some(n) if shown >= n => Some(self.quit_key),
                _ => None,
            })
        }

        fn close(&mut self) {
            self.log.borrow_mut().display_closes += 1;
        }
    }

    struct Builder {
        frames: Vec<Read>,
        ears: Vec<Option<f32>>,
        quit_after: Option<usize>,
        quit_key: char,
        display_fails: bool,
        emotion: bool,
        classifier: bool,
    }

    impl Builder {
        fn frames(n: usize) -> Self {
            Self {
                frames: (0..n).map(|_| Read::Frame).collect(),
                ears: Vec::new(),
                quit_after: None,
                quit_key: QUIT_KEY,
                display_fails: false,
                emotion: false,
                classifier: true,
            }
        }

        fn build(self) -> (Session, Shared) {
            let log = Shared::default();
            let source = ScriptedSource {
                log: log.clone(),
                script: self.frames.into(),
            };
            let dms = DmsModule::new(&DmsConfig::study_lamp(), Box::new(ScriptedFaces(self.ears.into())));
            let presenter = AlertPresenter::new(
                &AlertConfig::default(),
                Box::new(RecordingSound(log.clone())),
                Box::new(RecordingOverlay(log.clone())),
            );
            let display = RecordingDisplay {
                log: log.clone(),
                quit_after: self.quit_after,
                quit_key: self.quit_key,
                fail: self.display_fails,
            };
            let mut session = Session::new(Box::new(source), dms, presenter, Box::new(display));
            if self.emotion {
                let classifier: Option<Box<dyn EmotionClassifier>> = if self.classifier {
                    Some(Box::new(CountingClassifier(log.clone())))
                } else {
                    None
                };
                session = session.with_emotion(EmotionSampler::new(15), classifier);
            }
            (session, log)
        }
    }

    fn assert_cleaned_up_once(log: &Shared) {
        let log = log.borrow();
        assert_eq!(log.releases, 1);
        assert_eq!(log.display_closes, 1);
        assert_eq!(log.overlay_closes, 1);
    }

    #[test]
    fn test_ends_on_end_of_stream() {
        let (mut session, log) = Builder::frames(3).build();
        let summary = session.run().unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.stop_reason, StopReason::EndOfStream);
        assert_eq!(log.borrow().shown.len(), 3);

        drop(session);
        assert_cleaned_up_once(&log);
    }

    #[test]
    fn test_quit_key_stops_loop() {
        let mut builder = Builder::frames(10);
        builder.quit_after = Some(2);
        let (mut session, log) = builder.build();
        let summary = session.run().unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.stop_reason, StopReason::QuitKey);
        assert_eq!(log.borrow().reads, 2);
        assert_cleaned_up_once(&log);
    }

    #[test]
    fn test_only_lowercase_q_quits() {
        let mut builder = Builder::frames(4);
        builder.quit_after = Some(1);
        builder.quit_key = 'Q';
        let (mut session, _log) = builder.build();
        let summary = session.run().unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.stop_reason, StopReason::EndOfStream);
    }

    #[test]
    fn test_capture_error_ends_session() {
        let mut builder = Builder::frames(2);
        builder.frames.push(Read::Fail);
        builder.frames.push(Read::Frame);
        let (mut session, log) = builder.build();
        let summary = session.run().unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.stop_reason, StopReason::CaptureError);
        assert_cleaned_up_once(&log);
    }

    #[test]
    fn test_display_error_still_cleans_up() {
        let mut builder = Builder::frames(5);
        builder.display_fails = true;
        let (mut session, log) = builder.build();
        assert!(matches!(session.run(), Err(LampError::Display(_))));
        drop(session);
        assert_cleaned_up_once(&log);
    }

    #[test]
    fn test_classifier_runs_on_cadence_only() {
        let mut builder = Builder::frames(40);
        builder.emotion = true;
        let (mut session, log) = builder.build();
        let summary = session.run().unwrap();

        // frames 0, 15 and 30
        assert_eq!(log.borrow().classify_calls, 3);
        assert_eq!(summary.emotion_samples, 3);
        assert_eq!(summary.emotion_failures, 1);
        assert_eq!(summary.last_emotion, Some(Emotion::Happy));

        let log = log.borrow();
        assert!(log.shown[0].contains(&"Emotion: happy".to_string()));
        // failed sample on frame 15 keeps the last value
        assert!(log.shown[20].contains(&"Emotion: happy".to_string()));
        assert!(log.swatch.iter().all(|p| *p == Some([255, 255, 0])));
    }

    #[test]
    fn test_swatch_neutral_without_classifier() {
        let mut builder = Builder::frames(3);
        builder.emotion = true;
        builder.classifier = false;
        let (mut session, log) = builder.build();
        let summary = session.run().unwrap();

        assert_eq!(summary.emotion_samples, 0);
        assert_eq!(summary.last_emotion, Some(Emotion::Neutral));
        let log = log.borrow();
        assert_eq!(log.classify_calls, 0);
        assert_eq!(log.swatch, vec![Some([255, 255, 255]); 3]);
        assert!(log.shown.iter().all(|l| l.contains(&"Emotion: neutral".to_string())));
    }

    #[test]
    fn test_no_swatch_without_emotion_stage() {
        let (mut session, log) = Builder::frames(2).build();
        session.run().unwrap();
        assert_eq!(log.borrow().swatch, vec![Some([40, 40, 40]); 2]);
    }

    #[test]
    fn test_alarm_starts_sound_once() {
        let mut builder = Builder::frames(41);
        builder.ears = (0..40).map(|_| Some(0.1)).collect();
        builder.ears.push(Some(0.3));
        let (mut session, log) = builder.build();
        let summary = session.run().unwrap();

        assert_eq!(summary.alarms, 1);
        let log = log.borrow();
        assert_eq!(log.sound_starts, 1);
        assert_eq!(log.sound_stops, 1);
        assert!(!log.shown[33].contains(&"DROWSINESS ALERT!".to_string()));
        assert!(log.shown[34].contains(&"DROWSINESS ALERT!".to_string()));
        assert!(!log.shown[40].contains(&"DROWSINESS ALERT!".to_string()));
        // dark on the alarm frame, lit from frame 39, hidden on recovery
        assert_eq!(log.overlay, vec![true, false]);
    }

    #[test]
    fn test_flash_dark_while_phase_is_odd() {
        // Alarm on frames 34..=38, flash phase 35..=39
        let mut builder = Builder::frames(39);
        builder.ears = (0..39).map(|_| Some(0.1)).collect();
        let (mut session, log) = builder.build();
        session.run().unwrap();

        let log = log.borrow();
        assert_eq!(log.sound_starts, 1);
        assert!(log.overlay.is_empty());
    }

    #[test]
    fn test_missing_face_does_not_reset_counter() {
        let mut builder = Builder::frames(36);
        builder.ears = (0..20).map(|_| Some(0.1)).collect();
        builder.ears.push(None);
        builder.ears.extend((0..15).map(|_| Some(0.1)));
        let (mut session, log) = builder.build();
        session.run().unwrap();
        assert_eq!(log.borrow().sound_starts, 1);
    }
}
