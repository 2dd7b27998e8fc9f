//! `plumb-runtime` – the stateful half of the level pipeline
//!
//! Owns the session state and drives it from the sensor, the display clock
//! and operator input.
//!
//! # Modules
//!
//! - [`session`] – [`SessionController`][session::SessionController]:
//!   the single owner of mode, hold lock, feedback switch, calibration offset
//!   and the filtered reading.  Feeds samples through the mapper and filter,
//!   and turns each display tick into a
//!   [`RenderFrame`][plumb_types::RenderFrame], firing feedback on the
//!   off → on level edge.
//! - [`frame_loop`] – [`FrameLoop`][frame_loop::FrameLoop]:
//!   a single-task `tokio::select!` driver that waits on the
//!   [`PermissionGate`][plumb_kernel::PermissionGate], then multiplexes
//!   sensor samples, a periodic tick, operator commands and host visibility.
//!   Results are forwarded to a [`RenderSink`][plumb_middleware::RenderSink]
//!   and published on the [`EventBus`][plumb_middleware::EventBus].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export.

pub mod frame_loop;
pub mod session;
pub mod telemetry;

pub use frame_loop::{Command, DEFAULT_FRAME_RATE_HZ, FrameLoop, FrameLoopHandle};
pub use session::{SessionConfig, SessionController, SessionSnapshot, TickOutcome};
pub use telemetry::{TracerProviderGuard, init_tracing};
