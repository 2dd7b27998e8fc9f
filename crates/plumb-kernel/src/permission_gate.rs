//! [`PermissionGate`] – one-time sensor permission check.
//!
//! The gate asks a [`SensorSource`] for access at most once per session:
//!
//! 1. **Capability check**: a host without an orientation sensor resolves
//!    the gate to [`GateState::Unsupported`] without asking.
//! 2. **Permission request**: the source's asynchronous prompt.  Anything
//!    other than [`PermissionStatus::Granted`] (including a failed request)
//!    resolves the gate to [`GateState::Denied`].
//!
//! Once resolved, later calls to [`PermissionGate::acquire`] replay the
//! stored outcome.  There is no automatic retry after a denial.
//!
//! # Example
//!
//! ```
//! use plumb_kernel::{GateState, PermissionGate};
//! use plumb_middleware::ChannelSensor;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let (mut sensor, _injector) = ChannelSensor::new();
//! let mut gate = PermissionGate::new();
//! assert!(gate.acquire(&mut sensor).await.is_ok());
//! assert_eq!(gate.state(), GateState::Granted);
//! # });
//! ```

use plumb_middleware::{PermissionStatus, SensorSource};
use plumb_types::LevelError;
use tracing::{info, warn};

/// Resolution state of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// No request has been made yet.
    #[default]
    Unrequested,
    Granted,
    Denied,
    /// The host has no orientation sensor.
    Unsupported,
}

/// Guards sensor access for a single session.
#[derive(Debug, Default)]
pub struct PermissionGate {
    state: GateState,
}

impl PermissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Resolve the gate against `source`, prompting only on the first call.
    ///
    /// # Errors
    ///
    /// - [`LevelError::UnsupportedDevice`] – the host has no sensor.
    /// - [`LevelError::PermissionDenied`] – the user refused access, or the
    ///   request itself failed.
    pub async fn acquire<S>(&mut self, source: &mut S) -> Result<(), LevelError>
    where
        S: SensorSource + ?Sized,
    {
        if self.state == GateState::Unrequested {
            self.state = Self::resolve(source).await;
        }

        match self.state {
            GateState::Granted => Ok(()),
            GateState::Unsupported => Err(LevelError::UnsupportedDevice),
            GateState::Denied | GateState::Unrequested => Err(LevelError::PermissionDenied),
        }
    }

    async fn resolve<S>(source: &mut S) -> GateState
    where
        S: SensorSource + ?Sized,
    {
        if !source.is_supported() {
            warn!("orientation sensor not supported on this host");
            return GateState::Unsupported;
        }

        match source.request_permission().await {
            Ok(PermissionStatus::Granted) => {
                info!("sensor permission granted");
                GateState::Granted
            }
            Ok(PermissionStatus::Denied) => {
                warn!("sensor permission denied; the level will not start");
                GateState::Denied
            }
            Err(e) => {
                warn!(error = %e, "sensor permission request failed");
                GateState::Denied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::stream::{self, BoxStream, StreamExt};
    use plumb_middleware::ChannelSensor;
    use plumb_types::RawSample;

    /// Counts how often it was asked, to prove there is no retry.
    struct CountingSource {
        asked: usize,
        answer: Result<PermissionStatus, LevelError>,
    }

    #[async_trait]
    impl SensorSource for CountingSource {
        fn is_supported(&self) -> bool {
            true
        }

        async fn request_permission(&mut self) -> Result<PermissionStatus, LevelError> {
            self.asked += 1;
            self.answer.clone()
        }

        fn samples(&mut self) -> BoxStream<'static, RawSample> {
            stream::empty().boxed()
        }
    }

    #[tokio::test]
    async fn granted_opens_the_gate() {
        let (mut sensor, _injector) = ChannelSensor::new();
        let mut gate = PermissionGate::new();
        assert_eq!(gate.state(), GateState::Unrequested);

        gate.acquire(&mut sensor).await.unwrap();
        assert_eq!(gate.state(), GateState::Granted);
    }

    #[tokio::test]
    async fn denial_is_reported() {
        let (sensor, _injector) = ChannelSensor::new();
        let mut sensor = sensor.denied();
        let mut gate = PermissionGate::new();

        let err = gate.acquire(&mut sensor).await.unwrap_err();
        assert_eq!(err, LevelError::PermissionDenied);
        assert_eq!(gate.state(), GateState::Denied);
    }

    #[tokio::test]
    async fn unsupported_device_is_distinct_from_denial() {
        let (sensor, _injector) = ChannelSensor::new();
        let mut sensor = sensor.unsupported();
        let mut gate = PermissionGate::new();

        let err = gate.acquire(&mut sensor).await.unwrap_err();
        assert_eq!(err, LevelError::UnsupportedDevice);
        assert_eq!(gate.state(), GateState::Unsupported);
    }

    #[tokio::test]
    async fn denial_is_never_retried() {
        let mut source = CountingSource {
            asked: 0,
            answer: Ok(PermissionStatus::Denied),
        };
        let mut gate = PermissionGate::new();

        assert!(gate.acquire(&mut source).await.is_err());
        assert!(gate.acquire(&mut source).await.is_err());
        assert_eq!(source.asked, 1);
    }

    #[tokio::test]
    async fn grant_is_asked_once() {
        let mut source = CountingSource {
            asked: 0,
            answer: Ok(PermissionStatus::Granted),
        };
        let mut gate = PermissionGate::new();

        gate.acquire(&mut source).await.unwrap();
        gate.acquire(&mut source).await.unwrap();
        assert_eq!(source.asked, 1);
    }

    #[tokio::test]
    async fn failed_request_counts_as_denied() {
        let mut source = CountingSource {
            asked: 0,
            answer: Err(LevelError::Channel("prompt dismissed".into())),
        };
        let mut gate = PermissionGate::new();

        assert_eq!(
            gate.acquire(&mut source).await,
            Err(LevelError::PermissionDenied)
        );
        assert_eq!(gate.state(), GateState::Denied);
    }
}
