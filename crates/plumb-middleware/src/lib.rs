//! `plumb-middleware` – wiring between the pipeline and its collaborators.
//!
//! Routes data between the sensor, the level pipeline and whatever renders
//! or listens, without caring about the data's meaning.
//!
//! # Modules
//!
//! - [`bus`] – topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.
//! - [`adapter`] – the collaborator traits: [`SensorSource`] for tilt input
//!   and [`RenderSink`] for display output.
//! - [`channel_sensor`] – [`ChannelSensor`], a sensor source fed from an
//!   in-process channel, used by the terminal host and by tests.
//! - [`recording_sink`] – [`RecordingSink`], a render sink that logs every
//!   frame for headless inspection.

pub mod adapter;
pub mod bus;
pub mod channel_sensor;
pub mod recording_sink;

pub use adapter::{PermissionStatus, RenderSink, SensorSource};
pub use bus::{EventBus, Topic, TopicReceiver};
pub use channel_sensor::{ChannelSensor, SampleInjector};
pub use recording_sink::RecordingSink;
