//! Mode-specific angle computation.
//!
//! Given the filtered angles, the calibration offset and the active
//! [`Mode`], [`compute`] produces the single angle shown to the user and the
//! geometry the renderer needs:
//!
//! | mode | display angle | geometry |
//! |---|---|---|
//! | horizontal | `y − cal.y` | bubble at `bubble_position(display)` |
//! | vertical | `90 − |x − cal.x|` | bubble at `bubble_position((x − cal.x) − 90)` |
//! | angle finder | `y − cal.y` | protractor needle at `display + 90°` |
//!
//! Vertical mode treats 90° of front-back tilt as plumb, so the bubble input
//! is shifted by 90° and reuses the horizontal formula.

use plumb_types::{AngleTriple, Geometry, Mode};
use serde::{Deserialize, Serialize};

/// Half-width of the bubble vial's dynamic range, in degrees.
const BUBBLE_RANGE_DEG: f64 = 45.0;

/// Where the protractor is drawn, in the renderer's coordinate space.
///
/// The core never assumes pixel geometry; the renderer supplies this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtractorFrame {
    pub center_x: f64,
    pub center_y: f64,
    /// Needle length.
    pub radius: f64,
}

impl Default for ProtractorFrame {
    fn default() -> Self {
        Self {
            center_x: 150.0,
            center_y: 150.0,
            radius: 100.0,
        }
    }
}

impl ProtractorFrame {
    /// Point at `radius` from the centre along `angle_deg`, where 0° is
    /// straight up.  Screen y grows downward.
    pub fn point_at(&self, angle_deg: f64, radius: f64) -> (f64, f64) {
        let theta = (angle_deg + 90.0).to_radians();
        (
            self.center_x + radius * theta.cos(),
            self.center_y - radius * theta.sin(),
        )
    }
}

/// Display angle plus geometry for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub display_angle: f64,
    pub geometry: Geometry,
}

/// Map an angle onto the bubble vial as a percentage.
///
/// The angle is clamped to ±45°, so `-45 → 0`, `0 → 50`, `45 → 100`, and
/// anything beyond the range saturates at the rail.
pub fn bubble_position(angle: f64) -> f64 {
    let clamped = angle.clamp(-BUBBLE_RANGE_DEG, BUBBLE_RANGE_DEG);
    (clamped + BUBBLE_RANGE_DEG) / (2.0 * BUBBLE_RANGE_DEG) * 100.0
}

/// Compute the display angle and geometry for `mode`.
pub fn compute(
    mode: Mode,
    filtered: AngleTriple,
    calibration: AngleTriple,
    protractor: &ProtractorFrame,
) -> Reading {
    match mode {
        Mode::Horizontal => {
            let angle = filtered.y - calibration.y;
            Reading {
                display_angle: angle,
                geometry: Geometry::Bubble {
                    percent: bubble_position(angle),
                    vertical: false,
                },
            }
        }
        Mode::Vertical => {
            let vertical_angle = filtered.x - calibration.x;
            Reading {
                display_angle: 90.0 - vertical_angle.abs(),
                geometry: Geometry::Bubble {
                    percent: bubble_position(vertical_angle - 90.0),
                    vertical: true,
                },
            }
        }
        Mode::AngleFinder => {
            let angle = filtered.y - calibration.y;
            let theta = (angle + 90.0).to_radians();
            let (end_x, end_y) = protractor.point_at(angle, protractor.radius);
            Reading {
                display_angle: angle,
                geometry: Geometry::Protractor {
                    unit: (theta.cos(), theta.sin()),
                    end_x,
                    end_y,
                },
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Protractor scale
// ────────────────────────────────────────────────────────────────────────────

// Scale proportions, as multiples of the needle radius.
const SCALE_RADIUS: f64 = 1.2;
const MAJOR_TICK_LEN: f64 = 0.15;
const MINOR_TICK_LEN: f64 = 0.08;
const LABEL_INSET: f64 = 0.25;

/// One tick mark on the protractor scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtractorTick {
    pub degrees: i32,
    /// Inner end of the tick.
    pub inner: (f64, f64),
    /// Outer end of the tick, on the scale arc.
    pub outer: (f64, f64),
    pub major: bool,
    /// Label anchor for major ticks.
    pub label_at: Option<(f64, f64)>,
}

/// Tick marks every 10° from -90° to 90°.  Every 30° is a labelled major
/// tick.
///
/// The arc sits just outside the needle (`1.2 × frame.radius`) and every
/// length scales with `frame.radius`.
pub fn protractor_scale(frame: &ProtractorFrame) -> Vec<ProtractorTick> {
    let arc = SCALE_RADIUS * frame.radius;
    (-90..=90)
        .step_by(10)
        .map(|deg| {
            let angle = f64::from(deg);
            let major = deg % 30 == 0;
            let len = (if major { MAJOR_TICK_LEN } else { MINOR_TICK_LEN }) * frame.radius;
            ProtractorTick {
                degrees: deg,
                inner: frame.point_at(angle, arc - len),
                outer: frame.point_at(angle, arc),
                major,
                label_at: major
                    .then(|| frame.point_at(angle, arc - LABEL_INSET * frame.radius)),
            }
        })
        .collect()
}
