//! [`SessionController`] – the single owner of a level session's state.
//!
//! Each session holds exactly one copy of:
//!
//! * the active [`Mode`],
//! * the hold lock and the feedback switch,
//! * the filtered [`AngleTriple`] and the calibration offset,
//! * the previous tick's level state (edge detection only).
//!
//! Two entry points drive it:
//!
//! 1. **Sample** – [`SessionController::on_sample`] maps and smooths a raw
//!    reading into the filtered value.  Skipped entirely while holding.
//! 2. **Tick** – [`SessionController::tick`] turns the filtered value into a
//!    [`RenderFrame`], checks the level state and fires feedback on the
//!    off → on edge.
//!
//! # Example
//!
//! ```
//! use plumb_hal::FeedbackDispatcher;
//! use plumb_runtime::session::{SessionConfig, SessionController};
//! use plumb_types::{LevelStatus, RawSample, ScreenOrientation};
//!
//! let mut session = SessionController::new(SessionConfig::default(), FeedbackDispatcher::default());
//! session.on_sample(&RawSample::new(0.0, 10.0, 0.0), ScreenOrientation::Portrait);
//!
//! let frame = session.tick();
//! assert!((frame.display_angle - 2.0).abs() < 1e-9);
//! assert_eq!(frame.status, LevelStatus::OffBy(frame.display_angle.abs()));
//! ```

use plumb_hal::{FeedbackDispatcher, FeedbackReport};
use plumb_perception::{AngleFilter, DEFAULT_TOLERANCE, LevelEvent, ProtractorFrame, level, mapper, mode};
use plumb_types::{AngleTriple, LevelError, Mode, RawSample, RenderFrame, ScreenOrientation};
use serde::Serialize;
use tracing::{debug, info};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub filter: AngleFilter,
    /// Degrees either side of 0° / 90° that count as level.
    pub tolerance: f64,
    pub initial_mode: Mode,
    pub feedback_enabled: bool,
    pub protractor: ProtractorFrame,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter: AngleFilter::default(),
            tolerance: DEFAULT_TOLERANCE,
            initial_mode: Mode::Horizontal,
            feedback_enabled: true,
            protractor: ProtractorFrame::default(),
        }
    }
}

impl SessionConfig {
    /// Build a config from raw numbers, validating each.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::InvalidConfig`] for an alpha outside `(0, 1]`
    /// or a negative or non-finite tolerance.
    pub fn new(alpha: f64, tolerance: f64) -> Result<Self, LevelError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(LevelError::InvalidConfig(format!(
                "level tolerance must be a non-negative number, got {tolerance}"
            )));
        }
        Ok(Self {
            filter: AngleFilter::new(alpha)?,
            tolerance,
            ..Self::default()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outputs
// ─────────────────────────────────────────────────────────────────────────────

/// Everything one display tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub frame: RenderFrame,
    pub event: LevelEvent,
    /// `Some` only when feedback was dispatched on this tick.
    pub feedback: Option<FeedbackReport>,
}

/// Serializable view of the session for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub holding: bool,
    pub feedback_enabled: bool,
    pub filtered: AngleTriple,
    pub calibration: AngleTriple,
    pub is_level: bool,
    pub alpha: f64,
    pub tolerance: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionController
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the mutable state of one level session.
pub struct SessionController {
    config: SessionConfig,
    dispatcher: FeedbackDispatcher,
    mode: Mode,
    holding: bool,
    feedback_enabled: bool,
    filtered: AngleTriple,
    calibration: AngleTriple,
    previous_level: bool,
}

impl SessionController {
    pub fn new(config: SessionConfig, dispatcher: FeedbackDispatcher) -> Self {
        Self {
            mode: config.initial_mode,
            feedback_enabled: config.feedback_enabled,
            config,
            dispatcher,
            holding: false,
            filtered: AngleTriple::ZERO,
            calibration: AngleTriple::ZERO,
            previous_level: false,
        }
    }

    // -------------------------------------------------------------------------
    // Operator transitions
    // -------------------------------------------------------------------------

    /// Switch the measuring mode.  No other state is touched.
    pub fn set_mode(&mut self, mode: Mode) {
        info!(from = %self.mode, to = %mode, "mode changed");
        self.mode = mode;
    }

    /// Freeze or unfreeze the filtered value.  Returns the new hold state.
    pub fn toggle_hold(&mut self) -> bool {
        self.holding = !self.holding;
        info!(holding = self.holding, "hold toggled");
        self.holding
    }

    /// Turn the level-reached cue on or off.  Returns the new state.
    pub fn toggle_feedback(&mut self) -> bool {
        self.feedback_enabled = !self.feedback_enabled;
        info!(enabled = self.feedback_enabled, "feedback toggled");
        self.feedback_enabled
    }

    /// Take the current filtered reading as the new zero.
    pub fn calibrate(&mut self) {
        self.calibration = self.filtered;
        info!(
            x = self.calibration.x,
            y = self.calibration.y,
            "calibrated"
        );
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    /// Map and smooth one sensor reading.  Ignored while holding.
    pub fn on_sample(&mut self, raw: &RawSample, orientation: ScreenOrientation) {
        if self.holding {
            return;
        }
        let mapped = mapper::map(raw, orientation);
        self.filtered = self.config.filter.update(self.filtered, mapped);
    }

    /// Produce the frame for the current display tick.
    pub fn tick(&mut self) -> RenderFrame {
        self.tick_detailed().frame
    }

    /// Like [`tick`][Self::tick], but also reports the level transition and
    /// any feedback dispatched.
    pub fn tick_detailed(&mut self) -> TickOutcome {
        let reading = mode::compute(
            self.mode,
            self.filtered,
            self.calibration,
            &self.config.protractor,
        );
        let check = level::check(
            reading.display_angle,
            self.previous_level,
            self.config.tolerance,
        );
        let event = check.event(self.previous_level);
        self.previous_level = check.is_level_now;

        let feedback = match event {
            LevelEvent::BecameLevel if self.feedback_enabled => {
                debug!(mode = %self.mode, angle = reading.display_angle, "became level");
                Some(self.dispatcher.fire())
            }
            LevelEvent::BecameLevel => {
                debug!(mode = %self.mode, "became level; feedback disabled");
                None
            }
            _ => None,
        };

        TickOutcome {
            frame: RenderFrame {
                mode: self.mode,
                display_angle: reading.display_angle,
                geometry: reading.geometry,
                is_level: check.is_level_now,
                holding: self.holding,
                status: check.status(reading.display_angle),
            },
            event,
            feedback,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    pub fn feedback_enabled(&self) -> bool {
        self.feedback_enabled
    }

    pub fn filtered(&self) -> AngleTriple {
        self.filtered
    }

    pub fn calibration(&self) -> AngleTriple {
        self.calibration
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            holding: self.holding,
            feedback_enabled: self.feedback_enabled,
            filtered: self.filtered,
            calibration: self.calibration,
            is_level: self.previous_level,
            alpha: self.config.filter.alpha(),
            tolerance: self.config.tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plumb_hal::sim::{SimHaptic, SimTone};
    use plumb_types::{Geometry, LevelStatus};

    const EPS: f64 = 1e-9;

    fn session() -> SessionController {
        SessionController::new(SessionConfig::default(), FeedbackDispatcher::default())
    }

    fn sample_gamma(session: &mut SessionController, gamma: f64) {
        session.on_sample(&RawSample::new(0.0, gamma, 0.0), ScreenOrientation::Portrait);
    }

    /// Force the filtered value by using an alpha of 1.
    fn unsmoothed() -> SessionController {
        let config = SessionConfig::new(1.0, DEFAULT_TOLERANCE).unwrap();
        SessionController::new(config, FeedbackDispatcher::default())
    }

    #[test]
    fn starts_with_defaults() {
        let s = session();
        assert_eq!(s.mode(), Mode::Horizontal);
        assert!(!s.is_holding());
        assert!(s.feedback_enabled());
        assert_eq!(s.filtered(), AngleTriple::ZERO);
        assert_eq!(s.calibration(), AngleTriple::ZERO);
    }

    #[test]
    fn config_rejects_bad_values() {
        assert!(SessionConfig::new(0.0, 0.2).is_err());
        assert!(SessionConfig::new(1.5, 0.2).is_err());
        assert!(SessionConfig::new(0.2, -0.1).is_err());
        assert!(SessionConfig::new(0.2, f64::NAN).is_err());
        assert!(SessionConfig::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn sample_is_smoothed() {
        let mut s = session();
        sample_gamma(&mut s, 10.0);
        assert!((s.filtered().y - 2.0).abs() < EPS);
        sample_gamma(&mut s, 10.0);
        assert!((s.filtered().y - 3.6).abs() < EPS);
    }

    #[test]
    fn non_finite_sample_does_not_stick_in_the_filter() {
        let mut s = session();
        s.on_sample(&RawSample::new(f64::NAN, f64::NAN, 0.0), ScreenOrientation::Portrait);
        assert_eq!(s.filtered(), AngleTriple::ZERO);

        for _ in 0..200 {
            sample_gamma(&mut s, 1.0);
        }
        assert!(s.filtered().y.is_finite());
        assert!((s.filtered().y - 1.0).abs() < 1e-6);

        s.calibrate();
        assert!(s.calibration().x.is_finite());
        assert!(s.calibration().y.is_finite());

        let frame = s.tick();
        assert!(frame.display_angle.is_finite());
        assert!(frame.is_level);
    }

    #[test]
    fn landscape_samples_are_remapped() {
        let mut s = unsmoothed();
        s.on_sample(&RawSample::new(10.0, 20.0, 30.0), ScreenOrientation::Landscape);
        assert_eq!(s.filtered(), AngleTriple::new(-20.0, 10.0, 30.0));
    }

    #[test]
    fn holding_freezes_and_release_resumes_from_frozen_value() {
        let mut s = session();
        sample_gamma(&mut s, 10.0);
        let frozen = s.filtered();

        assert!(s.toggle_hold());
        for _ in 0..20 {
            sample_gamma(&mut s, 40.0);
        }
        assert_eq!(s.filtered(), frozen);
        assert!(s.tick().holding);

        assert!(!s.toggle_hold());
        sample_gamma(&mut s, 40.0);
        let expected = 0.2 * 40.0 + 0.8 * frozen.y;
        assert!((s.filtered().y - expected).abs() < EPS);
    }

    #[test]
    fn calibrate_zeroes_horizontal_reading_and_is_idempotent() {
        let mut s = unsmoothed();
        sample_gamma(&mut s, 7.5);

        s.calibrate();
        let first = s.calibration();
        s.calibrate();
        assert_eq!(s.calibration(), first);

        let frame = s.tick();
        assert!(frame.display_angle.abs() < EPS);
        assert!(frame.is_level);
    }

    #[test]
    fn vertical_mode_display() {
        let mut s = unsmoothed();
        s.on_sample(&RawSample::new(85.0, 0.0, 0.0), ScreenOrientation::Portrait);
        s.set_mode(Mode::Vertical);

        let frame = s.tick();
        assert!((frame.display_angle - 5.0).abs() < EPS);
        assert!(matches!(frame.geometry, Geometry::Bubble { vertical: true, .. }));
        assert_eq!(frame.status, LevelStatus::OffBy(frame.display_angle.abs()));
    }

    #[test]
    fn mode_switch_keeps_other_state() {
        let mut s = unsmoothed();
        sample_gamma(&mut s, 3.0);
        s.calibrate();
        s.toggle_hold();
        s.toggle_feedback();

        s.set_mode(Mode::AngleFinder);
        let snap = s.snapshot();
        assert_eq!(snap.mode, Mode::AngleFinder);
        assert!(snap.holding);
        assert!(!snap.feedback_enabled);
        assert_eq!(snap.calibration.y, 3.0);
        assert!(matches!(s.tick().geometry, Geometry::Protractor { .. }));
    }

    #[test]
    fn feedback_fires_once_per_level_entry() {
        let haptic = SimHaptic::new("vibrator");
        let pulses = haptic.recorder();
        let config = SessionConfig::new(1.0, 0.2).unwrap();
        let mut s =
            SessionController::new(config, FeedbackDispatcher::default().with_haptic(Box::new(haptic)));

        let mut events = Vec::new();
        for gamma in [5.0, 0.1, 0.1, 5.0, 0.0] {
            sample_gamma(&mut s, gamma);
            events.push(s.tick_detailed().event);
        }

        assert_eq!(
            events,
            vec![
                LevelEvent::StillOff,
                LevelEvent::BecameLevel,
                LevelEvent::StillLevel,
                LevelEvent::LeftLevel,
                LevelEvent::BecameLevel,
            ]
        );
        assert_eq!(pulses.lock().unwrap().len(), 2);
    }

    #[test]
    fn feedback_disabled_still_detects_level() {
        let haptic = SimHaptic::new("vibrator");
        let pulses = haptic.recorder();
        let mut s = SessionController::new(
            SessionConfig::default(),
            FeedbackDispatcher::default().with_haptic(Box::new(haptic)),
        );
        assert!(!s.toggle_feedback());

        let outcome = s.tick_detailed();
        assert_eq!(outcome.event, LevelEvent::BecameLevel);
        assert!(outcome.frame.is_level);
        assert!(outcome.feedback.is_none());
        assert!(pulses.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_haptic_still_plays_tone_and_frame_is_produced() {
        let tone = SimTone::new("speaker");
        let beeps = tone.recorder();
        let mut s = SessionController::new(
            SessionConfig::default(),
            FeedbackDispatcher::default()
                .with_haptic(Box::new(SimHaptic::failing("broken")))
                .with_tone(Box::new(tone)),
        );

        let outcome = s.tick_detailed();
        assert_eq!(
            outcome.feedback,
            Some(FeedbackReport {
                haptic: false,
                tone: true
            })
        );
        assert_eq!(outcome.frame.status, LevelStatus::Level);
        assert_eq!(beeps.lock().unwrap().len(), 1);
    }

    #[test]
    fn snapshot_serializes() {
        let s = session();
        let json = serde_json::to_string(&s.snapshot()).unwrap();
        assert!(json.contains("\"mode\":\"horizontal\""));
        assert!(json.contains("\"tolerance\":0.2"));
    }
}
