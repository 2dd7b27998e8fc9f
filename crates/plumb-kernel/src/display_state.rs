//! [`DisplayLifecycle`] – whether the display tick should be running.
//!
//! The tick only runs while the host is visible.  Hiding the host suspends
//! it entirely; showing the host again resumes it without a second
//! permission prompt.
//!
//! | From | Event | To | Emits |
//! |---|---|---|---|
//! | `Idle` | `start` | `Running` | `Started` |
//! | `Running` | `set_visible(false)` | `Suspended` | `Suspended` |
//! | `Suspended` | `set_visible(true)` | `Running` | `Resumed` |
//! | any but `Stopped` | `stop` | `Stopped` | `Stopped` |
//!
//! Every other combination is a no-op and emits nothing.

use plumb_types::Lifecycle;
use tracing::info;

/// Current phase of the display loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayPhase {
    /// Waiting for the permission gate.
    #[default]
    Idle,
    Running,
    /// Host is hidden; no ticks are produced.
    Suspended,
    Stopped,
}

/// State machine for the display loop.
///
/// # Example
///
/// ```
/// use plumb_kernel::{DisplayLifecycle, DisplayPhase};
/// use plumb_types::Lifecycle;
///
/// let mut display = DisplayLifecycle::new();
/// assert_eq!(display.start(), Some(Lifecycle::Started));
/// assert_eq!(display.set_visible(false), Some(Lifecycle::Suspended));
/// assert!(!display.is_ticking());
/// assert_eq!(display.set_visible(true), Some(Lifecycle::Resumed));
/// assert_eq!(display.phase(), DisplayPhase::Running);
/// ```
#[derive(Debug, Default)]
pub struct DisplayLifecycle {
    phase: DisplayPhase,
    visible: bool,
}

impl DisplayLifecycle {
    /// A lifecycle that is idle and assumes the host is visible.
    pub fn new() -> Self {
        Self {
            phase: DisplayPhase::Idle,
            visible: true,
        }
    }

    pub fn phase(&self) -> DisplayPhase {
        self.phase
    }

    /// `true` when ticks should be produced.
    pub fn is_ticking(&self) -> bool {
        self.phase == DisplayPhase::Running
    }

    /// Begin ticking after permission has been granted.
    ///
    /// A host that was hidden before the start goes straight to
    /// [`DisplayPhase::Suspended`].
    pub fn start(&mut self) -> Option<Lifecycle> {
        if self.phase != DisplayPhase::Idle {
            return None;
        }
        if self.visible {
            self.transition(DisplayPhase::Running, Lifecycle::Started)
        } else {
            self.transition(DisplayPhase::Suspended, Lifecycle::Suspended)
        }
    }

    /// Record a host visibility change.
    pub fn set_visible(&mut self, visible: bool) -> Option<Lifecycle> {
        self.visible = visible;
        match (self.phase, visible) {
            (DisplayPhase::Running, false) => {
                self.transition(DisplayPhase::Suspended, Lifecycle::Suspended)
            }
            (DisplayPhase::Suspended, true) => {
                self.transition(DisplayPhase::Running, Lifecycle::Resumed)
            }
            _ => None,
        }
    }

    /// Stop for good.
    pub fn stop(&mut self) -> Option<Lifecycle> {
        if self.phase == DisplayPhase::Stopped {
            return None;
        }
        self.transition(DisplayPhase::Stopped, Lifecycle::Stopped)
    }

    fn transition(&mut self, to: DisplayPhase, milestone: Lifecycle) -> Option<Lifecycle> {
        info!(from = ?self.phase, to = ?to, "display lifecycle transition");
        self.phase = to;
        Some(milestone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_not_ticking() {
        let display = DisplayLifecycle::new();
        assert_eq!(display.phase(), DisplayPhase::Idle);
        assert!(!display.is_ticking());
    }

    #[test]
    fn hide_and_show_cycle() {
        let mut display = DisplayLifecycle::new();
        display.start();
        assert!(display.is_ticking());

        assert_eq!(display.set_visible(false), Some(Lifecycle::Suspended));
        // Repeated hide is a no-op.
        assert_eq!(display.set_visible(false), None);
        assert!(!display.is_ticking());

        assert_eq!(display.set_visible(true), Some(Lifecycle::Resumed));
        assert!(display.is_ticking());
    }

    #[test]
    fn visibility_before_start_is_remembered() {
        let mut display = DisplayLifecycle::new();
        assert_eq!(display.set_visible(false), None);
        assert_eq!(display.start(), Some(Lifecycle::Suspended));
        assert_eq!(display.phase(), DisplayPhase::Suspended);
    }

    #[test]
    fn start_twice_is_a_noop() {
        let mut display = DisplayLifecycle::new();
        assert_eq!(display.start(), Some(Lifecycle::Started));
        assert_eq!(display.start(), None);
    }

    #[test]
    fn stop_is_terminal() {
        let mut display = DisplayLifecycle::new();
        display.start();
        assert_eq!(display.stop(), Some(Lifecycle::Stopped));
        assert_eq!(display.stop(), None);
        assert_eq!(display.set_visible(true), None);
        assert_eq!(display.start(), None);
        assert!(!display.is_ticking());
    }

    #[test]
    fn stop_from_idle_is_allowed() {
        let mut display = DisplayLifecycle::new();
        assert_eq!(display.stop(), Some(Lifecycle::Stopped));
    }
}
