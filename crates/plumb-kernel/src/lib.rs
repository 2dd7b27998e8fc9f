//! `plumb-kernel` – Startup gating & display lifecycle
//!
//! Decides *whether* the level pipeline may run.  It computes nothing about
//! angles; it only enforces the order in which the pipeline is allowed to
//! start, pause and stop.
//!
//! # Modules
//!
//! - [`permission_gate`] – [`PermissionGate`][permission_gate::PermissionGate]:
//!   the one-time asynchronous gate in front of the sensor.  Sensor listening
//!   and the display tick do not start until it resolves to granted, and a
//!   denial is final for the session.
//! - [`display_state`] – [`DisplayLifecycle`][display_state::DisplayLifecycle]:
//!   tracks whether the display tick is running, suspended because the host
//!   is hidden, or stopped, and reports the
//!   [`Lifecycle`][plumb_types::Lifecycle] milestone each transition emits.

pub mod display_state;
pub mod permission_gate;

pub use display_state::{DisplayLifecycle, DisplayPhase};
pub use permission_gate::{GateState, PermissionGate};
