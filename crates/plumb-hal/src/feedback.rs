//! [`FeedbackDispatcher`] – best-effort haptic and audio cues.
//!
//! Both channels are optional and independent.  A missing channel is
//! skipped, a failing channel is logged and swallowed, and neither outcome
//! stops the other channel or the caller's display tick.

use plumb_types::LevelError;
use tracing::{debug, instrument, warn};

use crate::haptic::{Haptic, HapticPattern};
use crate::tone::{ToneGenerator, ToneSpec};

/// Which channels delivered on a [`FeedbackDispatcher::fire`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedbackReport {
    pub haptic: bool,
    pub tone: bool,
}

/// Fires the "level reached" cue on every available channel.
///
/// # Example
///
/// ```rust
/// use plumb_hal::feedback::FeedbackDispatcher;
/// use plumb_hal::sim::SimHaptic;
///
/// let haptic = SimHaptic::new("vibrator");
/// let played = haptic.recorder();
///
/// let mut dispatcher = FeedbackDispatcher::default().with_haptic(Box::new(haptic));
/// let report = dispatcher.fire();
///
/// assert!(report.haptic);
/// assert!(!report.tone); // no speaker registered
/// assert_eq!(played.lock().unwrap().len(), 1);
/// ```
#[derive(Default)]
pub struct FeedbackDispatcher {
    haptic: Option<Box<dyn Haptic>>,
    tone: Option<Box<dyn ToneGenerator>>,
    pattern: HapticPattern,
    spec: ToneSpec,
}

impl FeedbackDispatcher {
    /// Create a dispatcher with no channels and the given cue shapes.
    pub fn new(pattern: HapticPattern, spec: ToneSpec) -> Self {
        Self {
            haptic: None,
            tone: None,
            pattern,
            spec,
        }
    }

    /// Attach a vibration device, replacing any previous one.
    pub fn with_haptic(mut self, haptic: Box<dyn Haptic>) -> Self {
        self.haptic = Some(haptic);
        self
    }

    /// Attach a tone generator, replacing any previous one.
    pub fn with_tone(mut self, tone: Box<dyn ToneGenerator>) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn pattern(&self) -> &HapticPattern {
        &self.pattern
    }

    pub fn tone_spec(&self) -> &ToneSpec {
        &self.spec
    }

    /// Play the haptic pattern and the tone.  Never fails.
    #[instrument(level = "debug", skip(self))]
    pub fn fire(&mut self) -> FeedbackReport {
        let haptic = match self.haptic.as_mut() {
            Some(device) => {
                let result = device.vibrate(&self.pattern);
                deliver("haptic", device.id(), result)
            }
            None => {
                debug!("no haptic device; skipping vibration");
                false
            }
        };

        let tone = match self.tone.as_mut() {
            Some(device) => {
                let result = device.play(&self.spec);
                deliver("tone", device.id(), result)
            }
            None => {
                debug!("no tone generator; skipping beep");
                false
            }
        };

        FeedbackReport { haptic, tone }
    }
}

fn deliver(channel: &str, device: &str, result: Result<(), LevelError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(channel, device, error = %e, "feedback channel unavailable");
            false
        }
    }
}
