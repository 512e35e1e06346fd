//! Drowsiness state machine

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ear::EarReading;
use crate::DmsConfig;

/// Alarm state of the driver/user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrowsinessState {
    #[default]
    Awake,
    Alarm,
}

/// Edge emitted when the state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Eyes stayed closed for the configured number of frames
    AlarmRaised,
    /// Eyes reopened while the alarm was on
    AlarmCleared,
}

/// Debounces EAR readings over consecutive frames.
///
/// Entering the alarm needs `consecutive_frames` closed frames in a row;
/// leaving it takes a single open frame.
#[derive(Debug, Clone)]
pub struct DrowsinessMonitor {
    ear_threshold: f32,
    consecutive_frames: u32,
    closed_frames: u32,
    state: DrowsinessState,
}

impl DrowsinessMonitor {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            ear_threshold: config.ear_threshold,
            consecutive_frames: config.consecutive_frames,
            closed_frames: 0,
            state: DrowsinessState::Awake,
        }
    }

    /// Feed one face reading; returns the transition it caused, if any
    pub fn update(&mut self, reading: &EarReading) -> Option<Transition> {
        if reading.both_below(self.ear_threshold) {
            self.closed_frames = self.closed_frames.saturating_add(1);
            debug!(
                closed_frames = self.closed_frames,
                left = reading.left,
                right = reading.right,
                "Eyes closed"
            );
            if self.closed_frames >= self.consecutive_frames && self.state == DrowsinessState::Awake {
                self.state = DrowsinessState::Alarm;
                warn!("Drowsiness detected after {} frames", self.closed_frames);
                return Some(Transition::AlarmRaised);
            }
            None
        } else {
            self.closed_frames = 0;
            if self.state == DrowsinessState::Alarm {
                self.state = DrowsinessState::Awake;
                return Some(Transition::AlarmCleared);
            }
            None
        }
    }

    pub fn state(&self) -> DrowsinessState {
        self.state
    }

    pub fn is_alarm(&self) -> bool {
        self.state == DrowsinessState::Alarm
    }

    /// Consecutive closed-eye frames seen so far
    pub fn closed_frames(&self) -> u32 {
        self.closed_frames
    }

    pub fn ear_threshold(&self) -> f32 {
        self.ear_threshold
    }

    /// Back to awake with a zero counter
    pub fn reset(&mut self) {
        self.closed_frames = 0;
        self.state = DrowsinessState::Awake;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOSED: EarReading = EarReading { left: 0.1, right: 0.1 };
    const OPEN: EarReading = EarReading { left: 0.32, right: 0.3 };

    fn monitor() -> DrowsinessMonitor {
        DrowsinessMonitor::new(&DmsConfig::study_lamp())
    }

    #[test]
    fn test_one_short_of_threshold_never_alarms() {
        let mut m = monitor();
        for _ in 0..34 {
            assert_eq!(m.update(&CLOSED), None);
            assert!(!m.is_alarm());
        }
        assert_eq!(m.closed_frames(), 34);

        assert_eq!(m.update(&OPEN), None);
        assert!(!m.is_alarm());
        assert_eq!(m.closed_frames(), 0);
    }

    #[test]
    fn test_alarm_raised_exactly_once_on_frame_35() {
        let mut m = monitor();
        let mut raised_at = Vec::new();
        for frame in 1..=60 {
            if let Some(t) = m.update(&CLOSED) {
                assert_eq!(t, Transition::AlarmRaised);
                raised_at.push(frame);
            }
        }
        assert_eq!(raised_at, vec![35]);
        assert!(m.is_alarm());
        assert_eq!(m.closed_frames(), 60);
    }

    #[test]
    fn test_single_open_frame_clears_alarm() {
        let mut m = monitor();
        for _ in 0..100 {
            m.update(&CLOSED);
        }
        assert_eq!(m.update(&OPEN), Some(Transition::AlarmCleared));
        assert_eq!(m.state(), DrowsinessState::Awake);
        assert_eq!(m.closed_frames(), 0);

        // Stays awake, no repeated clear
        assert_eq!(m.update(&OPEN), None);
    }

    #[test]
    fn test_one_open_eye_resets_counter() {
        let mut m = monitor();
        for _ in 0..20 {
            m.update(&CLOSED);
        }
        m.update(&EarReading::new(0.1, 0.3));
        assert_eq!(m.closed_frames(), 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut m = monitor();
        let at_threshold = EarReading::new(0.23, 0.23);
        for _ in 0..50 {
            assert_eq!(m.update(&at_threshold), None);
        }
        assert_eq!(m.closed_frames(), 0);
    }

    #[test]
    fn test_realarm_after_recovery_needs_full_run() {
        let mut m = monitor();
        for _ in 0..35 {
            m.update(&CLOSED);
        }
        m.update(&OPEN);
        for _ in 0..34 {
            assert_eq!(m.update(&CLOSED), None);
        }
        assert_eq!(m.update(&CLOSED), Some(Transition::AlarmRaised));
    }

    #[test]
    fn test_reset() {
        let mut m = monitor();
        for _ in 0..40 {
            m.update(&CLOSED);
        }
        m.reset();
        assert_eq!(m.state(), DrowsinessState::Awake);
        assert_eq!(m.closed_frames(), 0);
    }
}
