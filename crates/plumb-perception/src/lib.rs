//! `plumb-perception` – the pure half of the orientation-to-display pipeline.
//!
//! Turns raw device tilt into the numbers a spirit level shows.  Nothing in
//! this crate performs I/O or owns session state; every function takes its
//! inputs explicitly and is safe to call repeatedly.
//!
//! # Modules
//!
//! - [`mapper`] – [`map`][mapper::map]: remaps raw `{beta, gamma, alpha}`
//!   readings into a normalized [`AngleTriple`][plumb_types::AngleTriple],
//!   swapping axes in landscape.
//! - [`filter`] – [`AngleFilter`][filter::AngleFilter]: first-order
//!   exponential moving average applied independently per axis.
//! - [`mode`] – [`compute`][mode::compute]: the display angle and the bubble
//!   or protractor geometry for the active [`Mode`][plumb_types::Mode].
//! - [`level`] – [`check`][level::check]: level/plumb detection with
//!   edge-triggered feedback.

pub mod filter;
pub mod level;
pub mod mapper;
pub mod mode;

pub use filter::{AngleFilter, DEFAULT_ALPHA};
pub use level::{DEFAULT_TOLERANCE, LevelCheck, LevelEvent};
pub use mode::{ProtractorFrame, ProtractorTick, Reading, bubble_position, protractor_scale};
