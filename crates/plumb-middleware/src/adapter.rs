//! Collaborator traits at the edges of the level pipeline.
//!
//! The pipeline never reads a sensor or draws a pixel itself.  A host
//! provides a [`SensorSource`] that delivers tilt readings and a
//! [`RenderSink`] that turns each [`RenderFrame`] into whatever the host
//! displays.
//!
//! # Contract
//!
//! * `SensorSource::is_supported` – `false` when the host has no
//!   orientation sensor at all.  The pipeline never starts.
//! * `SensorSource::request_permission` – a one-time asynchronous gate.
//!   Only [`PermissionStatus::Granted`] lets the pipeline start.
//! * `SensorSource::samples` – readings arrive asynchronously, at no
//!   guaranteed rate, with any field possibly absent.
//! * `RenderSink::render` – called once per display tick.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use plumb_types::{LevelError, RawSample, RenderFrame};

/// Outcome of a sensor permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// A source of device-orientation readings.
#[async_trait]
pub trait SensorSource: Send {
    /// `true` when the host exposes an orientation sensor.
    fn is_supported(&self) -> bool;

    /// Ask the user (or platform) for sensor access.
    ///
    /// # Errors
    ///
    /// Returns an error when the request itself could not be made; callers
    /// treat this the same as a denial.
    async fn request_permission(&mut self) -> Result<PermissionStatus, LevelError>;

    /// Hand over the live stream of readings.  Called once, after
    /// permission has been granted.
    fn samples(&mut self) -> BoxStream<'static, RawSample>;
}

/// Receives one frame per display tick.
pub trait RenderSink: Send {
    fn render(&mut self, frame: &RenderFrame);
}
