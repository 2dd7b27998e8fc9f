//! Generic `Haptic` trait for vibration motors and similar actuators.

use plumb_types::LevelError;
use serde::{Deserialize, Serialize};

/// Alternating on/off durations in milliseconds, starting with "on".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticPattern(pub Vec<u32>);

impl HapticPattern {
    /// Total time the pattern takes to play, including pauses.
    pub fn total_ms(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Time the motor is actually running.
    pub fn on_ms(&self) -> u32 {
        self.0.iter().step_by(2).sum()
    }
}

impl Default for HapticPattern {
    /// Two 100 ms pulses separated by 50 ms.
    fn default() -> Self {
        Self(vec![100, 50, 100])
    }
}

/// A device that can play a vibration pattern.
///
/// Implementations should return quickly; the pattern is fire-and-forget.
pub trait Haptic: Send + Sync {
    /// Stable identifier, e.g. `"vibrator"`.
    fn id(&self) -> &str;

    /// Start playing `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::FeedbackChannelUnavailable`] when the device
    /// refuses or is missing.
    fn vibrate(&mut self, pattern: &HapticPattern) -> Result<(), LevelError>;
}
