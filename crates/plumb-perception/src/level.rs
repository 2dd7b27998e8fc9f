//! Level and plumb detection.
//!
//! A reading is "level" when it lies within `tolerance` of 0° or of ±90°.
//! Both targets are always checked, whatever the active mode.  The previous
//! tick's state is passed back in so the detector can report the
//! off → on edge, which is the only transition that triggers feedback.
//!
//! | previous | now | event | feedback |
//! |---|---|---|---|
//! | off | off | [`LevelEvent::StillOff`] | no |
//! | off | on  | [`LevelEvent::BecameLevel`] | yes |
//! | on  | on  | [`LevelEvent::StillLevel`] | no |
//! | on  | off | [`LevelEvent::LeftLevel`] | no |

use plumb_types::LevelStatus;

/// Angular window, in degrees, within which a reading counts as on target.
pub const DEFAULT_TOLERANCE: f64 = 0.2;

/// Result of a single detector check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCheck {
    pub is_level_now: bool,
    pub just_became_level: bool,
}

/// Transition classification of a [`LevelCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEvent {
    StillOff,
    BecameLevel,
    StillLevel,
    LeftLevel,
}

impl LevelCheck {
    /// Classify this check given the previous tick's state.
    pub fn event(&self, previous_level: bool) -> LevelEvent {
        match (previous_level, self.is_level_now) {
            (false, false) => LevelEvent::StillOff,
            (false, true) => LevelEvent::BecameLevel,
            (true, true) => LevelEvent::StillLevel,
            (true, false) => LevelEvent::LeftLevel,
        }
    }

    /// Status text for `display_angle` under this check.
    pub fn status(&self, display_angle: f64) -> LevelStatus {
        if self.is_level_now {
            LevelStatus::Level
        } else {
            LevelStatus::OffBy(display_angle.abs())
        }
    }
}

/// `true` when `angle` is within `tolerance` of 0° or ±90°.
pub fn is_level(angle: f64, tolerance: f64) -> bool {
    let magnitude = angle.abs();
    magnitude <= tolerance || (magnitude - 90.0).abs() <= tolerance
}

/// Check `display_angle` against the level and plumb targets.
pub fn check(display_angle: f64, previous_level: bool, tolerance: f64) -> LevelCheck {
    let is_level_now = is_level(display_angle, tolerance);
    LevelCheck {
        is_level_now,
        just_became_level: is_level_now && !previous_level,
    }
}
