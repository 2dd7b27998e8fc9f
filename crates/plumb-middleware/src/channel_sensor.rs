//! [`ChannelSensor`] – a [`SensorSource`] fed from an in-process channel.
//!
//! Hosts without a physical tilt sensor (the terminal host, CI) push
//! readings through the paired [`SampleInjector`].  The permission outcome
//! and sensor availability are fixed at construction so tests can exercise
//! the denial and unsupported-device paths.
//!
//! # Example
//!
//! ```rust
//! use plumb_middleware::ChannelSensor;
//! use plumb_types::RawSample;
//!
//! let (sensor, injector) = ChannelSensor::new();
//! injector.send(RawSample::new(0.0, 1.5, 0.0)).unwrap();
//! # drop(sensor);
//! ```

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use plumb_types::{LevelError, RawSample};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::adapter::{PermissionStatus, SensorSource};

/// Sending half of a [`ChannelSensor`].
#[derive(Clone, Debug)]
pub struct SampleInjector {
    tx: mpsc::UnboundedSender<RawSample>,
}

impl SampleInjector {
    /// Deliver a reading to the sensor stream.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::Channel`] once the sensor has been dropped.
    pub fn send(&self, sample: RawSample) -> Result<(), LevelError> {
        self.tx
            .send(sample)
            .map_err(|_| LevelError::Channel("sensor stream closed".to_string()))
    }
}

/// A sensor source backed by an unbounded channel.
pub struct ChannelSensor {
    rx: Option<mpsc::UnboundedReceiver<RawSample>>,
    supported: bool,
    permission: PermissionStatus,
}

impl ChannelSensor {
    /// A supported sensor that grants permission.
    pub fn new() -> (Self, SampleInjector) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Some(rx),
                supported: true,
                permission: PermissionStatus::Granted,
            },
            SampleInjector { tx },
        )
    }

    /// Make every permission request resolve to denied.
    pub fn denied(mut self) -> Self {
        self.permission = PermissionStatus::Denied;
        self
    }

    /// Pretend the host has no orientation sensor.
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }
}

#[async_trait]
impl SensorSource for ChannelSensor {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn request_permission(&mut self) -> Result<PermissionStatus, LevelError> {
        debug!(outcome = ?self.permission, "channel sensor permission request");
        Ok(self.permission)
    }

    fn samples(&mut self) -> BoxStream<'static, RawSample> {
        match self.rx.take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => {
                warn!("sample stream already taken; returning an empty stream");
                stream::empty().boxed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_samples_reach_the_stream() {
        let (mut sensor, injector) = ChannelSensor::new();
        assert!(sensor.is_supported());
        assert_eq!(sensor.request_permission().await, Ok(PermissionStatus::Granted));

        let mut samples = sensor.samples();
        injector.send(RawSample::new(1.0, 2.0, 3.0)).unwrap();
        injector.send(RawSample::default()).unwrap();

        assert_eq!(samples.next().await, Some(RawSample::new(1.0, 2.0, 3.0)));
        assert_eq!(samples.next().await, Some(RawSample::default()));
    }

    #[tokio::test]
    async fn stream_ends_when_injector_dropped() {
        let (mut sensor, injector) = ChannelSensor::new();
        let mut samples = sensor.samples();
        drop(injector);
        assert_eq!(samples.next().await, None);
    }

    #[tokio::test]
    async fn second_take_is_empty() {
        let (mut sensor, _injector) = ChannelSensor::new();
        let _first = sensor.samples();
        let mut second = sensor.samples();
        assert_eq!(second.next().await, None);
    }

    #[tokio::test]
    async fn denied_and_unsupported_variants() {
        let (sensor, _injector) = ChannelSensor::new();
        let mut sensor = sensor.denied();
        assert_eq!(sensor.request_permission().await, Ok(PermissionStatus::Denied));

        let (sensor, _injector) = ChannelSensor::new();
        assert!(!sensor.unsupported().is_supported());
    }

    #[test]
    fn send_after_drop_is_an_error() {
        let (sensor, injector) = ChannelSensor::new();
        drop(sensor);
        assert!(matches!(
            injector.send(RawSample::default()),
            Err(LevelError::Channel(_))
        ));
    }
}
