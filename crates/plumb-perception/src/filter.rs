//! Low-pass smoothing of tilt readings.
//!
//! A first-order exponential moving average, applied independently to each
//! axis of an [`AngleTriple`]:
//!
//! ```text
//! filtered' = α · raw + (1 − α) · filtered
//! ```
//!
//! where `α ∈ (0, 1]`.  Higher values track the raw input faster but pass
//! more sensor noise; `α = 1` disables smoothing.  With a constant input the
//! distance to the target shrinks by a factor `(1 − α)` on every update.
//!
//! The filter never stores the filtered value itself.  The caller owns it and
//! feeds it back in, so calling [`AngleFilter::update`] twice with the same
//! arguments yields the same result.
//!
//! # Example
//!
//! ```rust
//! use plumb_perception::filter::AngleFilter;
//! use plumb_types::AngleTriple;
//!
//! let filter = AngleFilter::new(0.5).unwrap();
//! let next = filter.update(AngleTriple::ZERO, AngleTriple::new(10.0, 0.0, 0.0));
//! assert!((next.x - 5.0).abs() < 1e-12);
//! ```

use plumb_types::{AngleTriple, LevelError};

/// Smoothing factor used when none is configured.
pub const DEFAULT_ALPHA: f64 = 0.2;

/// Apply one smoothing step with an explicit `alpha`.
///
/// `alpha` is not validated here; use [`AngleFilter`] for a checked factor.
pub fn smooth(previous: AngleTriple, raw: AngleTriple, alpha: f64) -> AngleTriple {
    let blend = |prev: f64, sample: f64| alpha * sample + (1.0 - alpha) * prev;
    AngleTriple {
        x: blend(previous.x, raw.x),
        y: blend(previous.y, raw.y),
        z: blend(previous.z, raw.z),
    }
}

/// An exponential smoothing filter with a validated factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleFilter {
    alpha: f64,
}

impl AngleFilter {
    /// Create a filter.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::InvalidConfig`] unless `0 < alpha <= 1`.
    pub fn new(alpha: f64) -> Result<Self, LevelError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(LevelError::InvalidConfig(format!(
                "filter alpha must be in (0, 1], got {alpha}"
            )));
        }
        Ok(Self { alpha })
    }

    /// The smoothing factor.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Blend `raw` into `previous` and return the new filtered value.
    pub fn update(&self, previous: AngleTriple, raw: AngleTriple) -> AngleTriple {
        smooth(previous, raw, self.alpha)
    }
}

impl Default for AngleFilter {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alpha_is_point_two() {
        assert!((AngleFilter::default().alpha() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn rejects_out_of_range_alpha() {
        assert!(AngleFilter::new(0.0).is_err());
        assert!(AngleFilter::new(-0.1).is_err());
        assert!(AngleFilter::new(1.5).is_err());
        assert!(AngleFilter::new(f64::NAN).is_err());
        assert!(AngleFilter::new(1.0).is_ok());
    }

    #[test]
    fn single_step_blends_each_axis() {
        let filter = AngleFilter::default();
        let next = filter.update(AngleTriple::new(10.0, 0.0, 100.0), AngleTriple::new(0.0, 10.0, 200.0));
        assert!((next.x - 8.0).abs() < 1e-9);
        assert!((next.y - 2.0).abs() < 1e-9);
        assert!((next.z - 120.0).abs() < 1e-9);
    }

    #[test]
    fn same_inputs_same_output() {
        let filter = AngleFilter::default();
        let prev = AngleTriple::new(1.0, 2.0, 3.0);
        let raw = AngleTriple::new(4.0, 5.0, 6.0);
        assert_eq!(filter.update(prev, raw), filter.update(prev, raw));
    }

    #[test]
    fn converges_geometrically_for_constant_input() {
        for &alpha in &[0.05, 0.2, 0.5, 0.9, 1.0] {
            let filter = AngleFilter::new(alpha).unwrap();
            let target = AngleTriple::new(12.0, -7.0, 90.0);
            let mut filtered = AngleTriple::ZERO;
            let mut gap = (filtered.x - target.x).abs();

            for _ in 0..20 {
                filtered = filter.update(filtered, target);
                let next_gap = (filtered.x - target.x).abs();
                assert!(
                    (next_gap - gap * (1.0 - alpha)).abs() < 1e-9,
                    "alpha {alpha}: gap {next_gap} is not (1-alpha) * {gap}"
                );
                gap = next_gap;
            }
        }
    }

    #[test]
    fn alpha_one_tracks_raw_exactly() {
        let filter = AngleFilter::new(1.0).unwrap();
        let raw = AngleTriple::new(3.0, -4.0, 5.0);
        assert_eq!(filter.update(AngleTriple::new(100.0, 100.0, 100.0), raw), raw);
    }
}
