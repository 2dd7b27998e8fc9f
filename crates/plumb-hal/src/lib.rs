//! `plumb-hal` – feedback hardware abstraction.
//!
//! The level pipeline never talks to a vibration motor or an audio device
//! directly.  It talks to the traits in this crate, and hosts plug in
//! whatever the platform offers (or nothing at all).
//!
//! # Modules
//!
//! - [`haptic`] – the [`Haptic`][haptic::Haptic] trait and the on/off
//!   [`HapticPattern`][haptic::HapticPattern] it plays.
//! - [`tone`] – the [`ToneGenerator`][tone::ToneGenerator] trait and the
//!   [`ToneSpec`][tone::ToneSpec] beep with its exponential gain envelope.
//! - [`feedback`] – [`FeedbackDispatcher`][feedback::FeedbackDispatcher]:
//!   fires both channels best-effort when the device becomes level.
//! - [`sim`] – recording stub drivers for headless tests.

pub mod feedback;
pub mod haptic;
pub mod sim;
pub mod tone;

pub use feedback::{FeedbackDispatcher, FeedbackReport};
pub use haptic::{Haptic, HapticPattern};
pub use tone::{ToneGenerator, ToneSpec};
