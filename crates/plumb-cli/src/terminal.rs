//! Terminal rendering and feedback channels.
//!
//! [`TerminalSink`] draws a one-line read-out of each [`RenderFrame`]:
//!
//! ```text
//! [horizontal] |··········(●)··········|  2.4°  OFF BY 2.4°
//! [angle]      -90 -60 -30 0 30 60 ‹90›  78.5°  OFF BY 78.5°   HOLD
//! ```
//!
//! In angle mode the dial lists the labelled ticks of the protractor scale
//! and marks the one the needle is nearest to.
//!
//! At 60 Hz most frames look the same, so a line is only printed when the
//! mode, hold or level state flips, or when the read-out text changes and
//! [`TerminalSink::MIN_INTERVAL`] has passed since the last line.

use std::io::Write;
use std::time::{Duration, Instant};

use colored::Colorize;
use plumb_hal::{Haptic, HapticPattern, ToneGenerator, ToneSpec};
use plumb_middleware::RenderSink;
use plumb_perception::{ProtractorFrame, ProtractorTick, protractor_scale};
use plumb_types::{Geometry, LevelError, Mode, RenderFrame};

const BAR_WIDTH: usize = 21;

// ─────────────────────────────────────────────────────────────────────────────
// TerminalSink
// ─────────────────────────────────────────────────────────────────────────────

/// What the last printed line showed.
#[derive(Debug, Clone, PartialEq)]
struct Shown {
    mode: Mode,
    holding: bool,
    is_level: bool,
    text: String,
}

/// Prints frames to stdout, throttled to meaningful changes.
pub struct TerminalSink {
    last: Option<(Shown, Instant)>,
    min_interval: Duration,
    scale: Vec<ProtractorTick>,
}

impl TerminalSink {
    /// Text-only changes are printed at most this often.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(500);

    /// `protractor` must be the frame the session computes needle tips in.
    pub fn new(protractor: &ProtractorFrame) -> Self {
        Self::with_interval(protractor, Self::MIN_INTERVAL)
    }

    pub fn with_interval(protractor: &ProtractorFrame, min_interval: Duration) -> Self {
        Self {
            last: None,
            min_interval,
            scale: protractor_scale(protractor),
        }
    }

    /// Decide whether `frame` deserves a new line at `now`.
    fn should_print(&self, shown: &Shown, now: Instant) -> bool {
        match &self.last {
            None => true,
            Some((prev, at)) => {
                if prev.mode != shown.mode
                    || prev.holding != shown.holding
                    || prev.is_level != shown.is_level
                {
                    return true;
                }
                prev.text != shown.text && now.duration_since(*at) >= self.min_interval
            }
        }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new(&ProtractorFrame::default())
    }
}

impl RenderSink for TerminalSink {
    fn render(&mut self, frame: &RenderFrame) {
        let shown = Shown {
            mode: frame.mode,
            holding: frame.holding,
            is_level: frame.is_level,
            text: frame.angle_text(),
        };
        let now = Instant::now();
        if !self.should_print(&shown, now) {
            return;
        }

        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", format_frame(frame, &self.scale));
        let _ = stdout.flush();
        self.last = Some((shown, now));
    }
}

/// One coloured line for `frame`.  `scale` is used for protractor frames.
pub fn format_frame(frame: &RenderFrame, scale: &[ProtractorTick]) -> String {
    let tag = format!("[{}]", frame.mode);
    let gauge = match frame.geometry {
        Geometry::Bubble { percent, vertical } => bubble_bar(percent, vertical),
        Geometry::Protractor { end_x, end_y, .. } => dial(scale, (end_x, end_y)),
    };
    let status = if frame.is_level {
        frame.status.to_string().bold().green()
    } else {
        frame.status.to_string().yellow()
    };
    let hold = if frame.holding {
        format!("  {}", "HOLD".bold().magenta())
    } else {
        String::new()
    };

    format!(
        "{:<13}{}  {:>6}  {}{}",
        tag.cyan(),
        gauge,
        frame.angle_text().bold(),
        status,
        hold
    )
}

/// A horizontal vial with the bubble at `percent` (0 = left, 100 = right).
fn bubble_bar(percent: f64, vertical: bool) -> String {
    let slot = ((percent.clamp(0.0, 100.0) / 100.0) * (BAR_WIDTH - 1) as f64).round() as usize;
    let vial: String = (0..BAR_WIDTH)
        .map(|i| if i == slot { '●' } else { '·' })
        .collect();
    let (open, close) = if vertical { ('⌈', '⌋') } else { ('|', '|') };
    format!("{open}{vial}{close}")
}

/// Labels of the major ticks, with the one nearest the needle tip marked.
///
/// Tick ends share the needle's centre, so the closest `outer` point is the
/// tick with the smallest angular distance to the needle.
fn dial(scale: &[ProtractorTick], tip: (f64, f64)) -> String {
    let distance = |p: (f64, f64)| (p.0 - tip.0).powi(2) + (p.1 - tip.1).powi(2);
    let nearest = scale
        .iter()
        .filter(|t| t.major)
        .min_by(|a, b| distance(a.outer).total_cmp(&distance(b.outer)))
        .map(|t| t.degrees);

    scale
        .iter()
        .filter(|t| t.major)
        .map(|t| {
            if Some(t.degrees) == nearest {
                format!("‹{}›", t.degrees)
            } else {
                t.degrees.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Feedback channels
// ─────────────────────────────────────────────────────────────────────────────

/// Stands in for a vibration motor by printing the pattern.
#[derive(Debug, Default)]
pub struct TerminalHaptic;

impl Haptic for TerminalHaptic {
    fn id(&self) -> &str {
        "terminal-haptic"
    }

    fn vibrate(&mut self, pattern: &HapticPattern) -> Result<(), LevelError> {
        let steps: Vec<String> = pattern.0.iter().map(|ms| format!("{ms}ms")).collect();
        println!("  {} {}", "≋ buzz".bold().magenta(), steps.join(" / ").dimmed());
        Ok(())
    }
}

/// Rings the terminal bell instead of synthesizing a tone.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl ToneGenerator for TerminalBell {
    fn id(&self) -> &str {
        "terminal-bell"
    }

    fn play(&mut self, spec: &ToneSpec) -> Result<(), LevelError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "\x07  {} {}",
            "♪ beep".bold().blue(),
            format!("{:.0} Hz, {} ms", spec.frequency_hz, spec.duration_ms).dimmed()
        )
        .map_err(|e| LevelError::FeedbackChannelUnavailable {
            channel: self.id().to_string(),
            details: e.to_string(),
        })
    }
}
