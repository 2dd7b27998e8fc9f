//! Device-frame to display-frame axis remapping.
//!
//! The sensor collaborator reports tilt relative to the device's natural
//! (portrait) axes.  When the screen is rotated the left-right and
//! front-back axes swap, so the reading is remapped before filtering:
//!
//! | orientation | x (front-back) | y (left-right) | z (heading) |
//! |---|---|---|---|
//! | portrait  | `beta`   | `gamma` | `alpha` |
//! | landscape | `-gamma` | `beta`  | `alpha` |
//!
//! No clamping happens here; the full reported range is passed through.

use plumb_types::{AngleTriple, RawSample, ScreenOrientation};

/// Map a raw sample into a normalized [`AngleTriple`].
///
/// Missing and non-finite fields (`NaN`, `±inf`) are treated as `0.0`.
///
/// ```rust
/// use plumb_perception::mapper::map;
/// use plumb_types::{AngleTriple, RawSample, ScreenOrientation};
///
/// let raw = RawSample::new(10.0, 20.0, 30.0);
/// assert_eq!(map(&raw, ScreenOrientation::Landscape), AngleTriple::new(-20.0, 10.0, 30.0));
/// ```
pub fn map(raw: &RawSample, orientation: ScreenOrientation) -> AngleTriple {
    let beta = finite_or_zero(raw.beta);
    let gamma = finite_or_zero(raw.gamma);
    let alpha = finite_or_zero(raw.alpha);

    match orientation {
        ScreenOrientation::Portrait => AngleTriple {
            x: beta,
            y: gamma,
            z: alpha,
        },
        // Negating gamma keeps "top edge tilted away" positive on x.
        ScreenOrientation::Landscape => AngleTriple {
            x: -gamma,
            y: beta,
            z: alpha,
        },
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}
