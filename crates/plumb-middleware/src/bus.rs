//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber receives
//! every message without any single subscriber blocking the others.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Frames`] | One [`RenderFrame`][plumb_types::RenderFrame] per display tick |
//! | [`Topic::Feedback`] | Level-entry events and feedback reports |
//! | [`Topic::SystemAlerts`] | Lifecycle milestones and faults |

use plumb_types::{Event, LevelError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// High-frequency display frames (~60 Hz).
    Frames,
    /// Level-entry transitions and the feedback they triggered.
    Feedback,
    /// Permission outcomes, loop start/stop and faults.
    SystemAlerts,
}

/// Shared event bus.  Clone it cheaply; all clones share the same channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    frames: broadcast::Sender<Event>,
    feedback: broadcast::Sender<Event>,
    system_alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus.  `capacity` applies to every topic independently.
    pub fn new(capacity: usize) -> Self {
        let (frames, _) = broadcast::channel(capacity);
        let (feedback, _) = broadcast::channel(capacity);
        let (system_alerts, _) = broadcast::channel(capacity);
        Self {
            frames,
            feedback,
            system_alerts,
        }
    }

    /// Publish `event` to `topic`.
    ///
    /// Returns the number of receivers handed the event.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::Channel`] when nobody is subscribed to the
    /// topic.  Publishers that treat the bus as best-effort ignore this.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, LevelError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| LevelError::Channel(format!("no subscribers for topic {topic:?}")))
    }

    /// Subscribe to a single topic.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Frames => &self.frames,
            Topic::Feedback => &self.feedback,
            Topic::SystemAlerts => &self.system_alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Lagging is logged and skipped over; `None` means the bus is closed.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive.  `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plumb_types::{EventPayload, Lifecycle, Mode};

    fn make_event(source: &str) -> Event {
        Event::new(source, EventPayload::Lifecycle(Lifecycle::Started))
    }

    #[tokio::test]
    async fn lifecycle_alert_reaches_subscriber() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);

        let event = make_event("plumb-runtime::test");
        bus.publish_to(Topic::SystemAlerts, event.clone())?;

        let received = alerts.recv().await.ok_or("no alert received")?;
        assert_eq!(received.id, event.id);
        assert!(matches!(
            received.payload,
            EventPayload::Lifecycle(Lifecycle::Started)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn every_feedback_subscriber_sees_each_level_entry() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut ui = bus.subscribe_to(Topic::Feedback);
        let mut logger = bus.subscribe_to(Topic::Feedback);
        assert_eq!(bus.subscriber_count(Topic::Feedback), 2);

        let entered = Event::new(
            "frame_loop",
            EventPayload::BecameLevel {
                mode: Mode::Vertical,
                display_angle: 0.1,
            },
        );
        assert_eq!(bus.publish_to(Topic::Feedback, entered.clone())?, 2);

        assert_eq!(ui.recv().await.ok_or("ui empty")?.id, entered.id);
        assert_eq!(logger.recv().await.ok_or("logger empty")?.id, entered.id);
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_is_an_error() {
        let bus = EventBus::default();
        let result = bus.publish_to(Topic::Feedback, make_event("test"));
        assert!(matches!(result, Err(LevelError::Channel(_))));
    }

    #[tokio::test]
    async fn topics_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
        let _frames = bus.subscribe_to(Topic::Frames);

        bus.publish_to(Topic::Frames, make_event("frame_loop"))?;

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), alerts.recv()).await;
        assert!(result.is_err(), "SystemAlerts must not see a Frames event");
        Ok(())
    }

    #[tokio::test]
    async fn slow_subscriber_skips_lagged_events() {
        let bus = EventBus::new(4);
        let mut slow = bus.subscribe_to(Topic::Frames);

        for _ in 0..32 {
            let _ = bus.publish_to(Topic::Frames, make_event("flood"));
        }

        // Lag is swallowed and the newest buffered events are still delivered.
        assert!(slow.recv().await.is_some());
    }

    #[test]
    fn try_recv_on_empty_topic_is_none() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Feedback);
        assert!(rx.try_recv().is_none());
        assert_eq!(rx.topic(), Topic::Feedback);
    }
}
