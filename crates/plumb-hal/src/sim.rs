//! In-process feedback drivers for tests and headless hosts.
//!
//! [`SimHaptic`] and [`SimTone`] record every cue they are asked to play
//! into a shared log, so a test can hand the driver to a
//! [`FeedbackDispatcher`][crate::feedback::FeedbackDispatcher] and still
//! inspect what was played.  The `failing` constructors build drivers that
//! always report [`LevelError::FeedbackChannelUnavailable`].

use std::sync::{Arc, Mutex};

use plumb_types::LevelError;

use crate::haptic::{Haptic, HapticPattern};
use crate::tone::{ToneGenerator, ToneSpec};

/// Shared record of played cues.
pub type Recorder<T> = Arc<Mutex<Vec<T>>>;

fn unavailable(channel: &str, id: &str) -> LevelError {
    LevelError::FeedbackChannelUnavailable {
        channel: channel.to_string(),
        details: format!("simulated device '{id}' is offline"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub haptic
// ────────────────────────────────────────────────────────────────────────────

/// A simulated vibration motor.
pub struct SimHaptic {
    id: String,
    played: Recorder<HapticPattern>,
    fail: bool,
}

impl SimHaptic {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            played: Recorder::default(),
            fail: false,
        }
    }

    /// A motor that always refuses to vibrate.
    pub fn failing(id: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(id)
        }
    }

    /// Handle to the log of played patterns.
    pub fn recorder(&self) -> Recorder<HapticPattern> {
        Arc::clone(&self.played)
    }
}

impl Haptic for SimHaptic {
    fn id(&self) -> &str {
        &self.id
    }

    fn vibrate(&mut self, pattern: &HapticPattern) -> Result<(), LevelError> {
        if self.fail {
            return Err(unavailable("haptic", &self.id));
        }
        if let Ok(mut log) = self.played.lock() {
            log.push(pattern.clone());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub tone generator
// ────────────────────────────────────────────────────────────────────────────

/// A simulated speaker.
pub struct SimTone {
    id: String,
    played: Recorder<ToneSpec>,
    fail: bool,
}

impl SimTone {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            played: Recorder::default(),
            fail: false,
        }
    }

    /// A speaker that always fails to open.
    pub fn failing(id: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(id)
        }
    }

    /// Handle to the log of played tones.
    pub fn recorder(&self) -> Recorder<ToneSpec> {
        Arc::clone(&self.played)
    }
}

impl ToneGenerator for SimTone {
    fn id(&self) -> &str {
        &self.id
    }

    fn play(&mut self, tone: &ToneSpec) -> Result<(), LevelError> {
        if self.fail {
            return Err(unavailable("tone", &self.id));
        }
        if let Ok(mut log) = self.played.lock() {
            log.push(*tone);
        }
        Ok(())
    }
}
