//! Emotion labels and the ambient lamp colour table

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGB colour triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Swap to the blue-green-red channel order used by OpenCV
    pub fn to_bgr(self) -> [u8; 3] {
        [self.2, self.1, self.0]
    }
}

/// Lamp colour for labels outside the table, or no label at all
pub const DEFAULT_COLOR: Rgb = Rgb(200, 200, 200);

/// Dominant facial emotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    #[default]
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Parse a classifier label, case-insensitively.
    ///
    /// Accepts FER+ class names as aliases.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "angry" | "anger" => Some(Emotion::Angry),
            "disgust" | "contempt" => Some(Emotion::Disgust),
            "fear" => Some(Emotion::Fear),
            "happy" | "happiness" => Some(Emotion::Happy),
            "sad" | "sadness" => Some(Emotion::Sad),
            "surprise" => Some(Emotion::Surprise),
            "neutral" => Some(Emotion::Neutral),
            _ => None,
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            Emotion::Angry => Rgb(255, 0, 0),
            Emotion::Disgust => Rgb(0, 128, 0),
            Emotion::Fear => Rgb(128, 0, 128),
            Emotion::Happy => Rgb(255, 255, 0),
            Emotion::Sad => Rgb(0, 0, 255),
            Emotion::Surprise => Rgb(255, 165, 0),
            Emotion::Neutral => Rgb(255, 255, 255),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lamp colour for an emotion label as produced by a classifier.
///
/// Only the exact lower-case table names map to a colour; everything else,
/// including `None`, gets [`DEFAULT_COLOR`].
pub fn color_for_emotion(label: Option<&str>) -> Rgb {
    label
        .and_then(|l| Emotion::ALL.iter().find(|e| e.as_str() == l))
        .map(Emotion::color)
        .unwrap_or(DEFAULT_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_table() {
        assert_eq!(color_for_emotion(Some("happy")), Rgb(255, 255, 0));
        assert_eq!(color_for_emotion(Some("angry")), Rgb(255, 0, 0));
        assert_eq!(color_for_emotion(Some("sad")), Rgb(0, 0, 255));
        assert_eq!(color_for_emotion(Some("neutral")), Rgb(255, 255, 255));
        assert_eq!(color_for_emotion(Some("surprise")), Rgb(255, 165, 0));
    }

    #[test]
    fn test_default_color() {
        assert_eq!(color_for_emotion(Some("unknown")), Rgb(200, 200, 200));
        assert_eq!(color_for_emotion(Some("unknown_emotion")), DEFAULT_COLOR);
        assert_eq!(color_for_emotion(None), Rgb(200, 200, 200));
        assert_eq!(color_for_emotion(Some("Happy")), DEFAULT_COLOR);
    }

    #[test]
    fn test_label_round_trip_and_aliases() {
        for e in Emotion::ALL {
            assert_eq!(Emotion::from_label(e.as_str()), Some(e));
            assert_eq!(color_for_emotion(Some(e.as_str())), e.color());
        }
        assert_eq!(Emotion::from_label("Happiness"), Some(Emotion::Happy));
        assert_eq!(Emotion::from_label("contempt"), Some(Emotion::Disgust));
        assert_eq!(Emotion::from_label("bored"), None);
    }

    #[test]
    fn test_bgr_order() {
        assert_eq!(Rgb(255, 165, 0).to_bgr(), [0, 165, 255]);
        assert_eq!(Emotion::default(), Emotion::Neutral);
    }
}
