//! Generic `ToneGenerator` trait and the level-reached beep.
//!
//! The beep is a short sine tone whose gain decays exponentially from
//! `start_gain` to `end_gain` over its duration:
//!
//! ```text
//! gain(t) = start · (end / start)^(t / duration)
//! ```

use plumb_types::LevelError;
use serde::{Deserialize, Serialize};

/// Description of a single sine tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    pub frequency_hz: f64,
    pub duration_ms: u32,
    pub start_gain: f64,
    pub end_gain: f64,
}

impl Default for ToneSpec {
    /// 800 Hz sine, 100 ms, gain 0.3 decaying to 0.01.
    fn default() -> Self {
        Self {
            frequency_hz: 800.0,
            duration_ms: 100,
            start_gain: 0.3,
            end_gain: 0.01,
        }
    }
}

impl ToneSpec {
    /// Envelope gain `elapsed_ms` into the tone.  Clamped to the tone's
    /// duration; zero-length tones report `end_gain`.
    pub fn gain_at(&self, elapsed_ms: f64) -> f64 {
        if self.duration_ms == 0 || self.start_gain <= 0.0 || self.end_gain <= 0.0 {
            return self.end_gain;
        }
        let progress = (elapsed_ms / f64::from(self.duration_ms)).clamp(0.0, 1.0);
        self.start_gain * (self.end_gain / self.start_gain).powf(progress)
    }
}

/// A device that can play a short tone.
pub trait ToneGenerator: Send + Sync {
    /// Stable identifier, e.g. `"speaker"`.
    fn id(&self) -> &str;

    /// Start playing `tone`.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::FeedbackChannelUnavailable`] when no audio
    /// output can be opened.
    fn play(&mut self, tone: &ToneSpec) -> Result<(), LevelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_endpoints() {
        let tone = ToneSpec::default();
        assert!((tone.gain_at(0.0) - 0.3).abs() < 1e-12);
        assert!((tone.gain_at(100.0) - 0.01).abs() < 1e-12);
        // Past the end stays at the floor.
        assert!((tone.gain_at(500.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn envelope_is_exponential() {
        let tone = ToneSpec::default();
        // Halfway through, gain is the geometric mean of the endpoints.
        let expected = (0.3f64 * 0.01).sqrt();
        assert!((tone.gain_at(50.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn zero_duration_reports_end_gain() {
        let tone = ToneSpec {
            duration_ms: 0,
            ..ToneSpec::default()
        };
        assert_eq!(tone.gain_at(0.0), tone.end_gain);
    }

    #[test]
    fn tone_is_pitch_length_and_envelope_only() {
        let value = serde_json::to_value(ToneSpec::default()).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["duration_ms", "end_gain", "frequency_hz", "start_gain"]
        );

        let parsed: ToneSpec = serde_json::from_str(
            r#"{"frequency_hz":440.0,"duration_ms":50,"start_gain":0.5,"end_gain":0.05}"#,
        )
        .unwrap();
        assert_eq!(parsed.frequency_hz, 440.0);
        assert_eq!(parsed.duration_ms, 50);
    }
}
