//! [`FrameLoop`] – the asynchronous driver around a [`SessionController`].
//!
//! Everything runs on one Tokio task.  A single `tokio::select!` multiplexes
//! four independent producers, and each handler runs to completion before the
//! next is polled, so the session needs no locking:
//!
//! | Branch | Source | Effect |
//! |---|---|---|
//! | sample | [`SensorSource::samples`] | map + smooth into the filtered value |
//! | tick | [`tokio::time::interval`] at the frame rate | render a frame, maybe fire feedback |
//! | command | [`FrameLoopHandle::send`] | mode / hold / feedback / calibrate / viewport |
//! | visibility | [`FrameLoopHandle::set_visible`] | suspend or resume the tick |
//!
//! # Startup
//!
//! [`FrameLoop::run`] first resolves the [`PermissionGate`].  Neither the
//! sample stream nor the tick starts until permission is granted; on denial
//! or an unsupported device the loop returns the error without rendering a
//! single frame and never asks again.
//!
//! # Bus traffic
//!
//! Publishing is best-effort; a topic without subscribers is not an error.
//!
//! | Topic | Payload |
//! |---|---|
//! | [`Topic::Frames`] | [`EventPayload::Frame`] on every tick |
//! | [`Topic::Feedback`] | [`EventPayload::BecameLevel`], [`EventPayload::FeedbackFired`] |
//! | [`Topic::SystemAlerts`] | [`EventPayload::Lifecycle`], [`EventPayload::Fault`] |

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use plumb_kernel::{DisplayLifecycle, PermissionGate};
use plumb_middleware::{EventBus, RenderSink, SensorSource, Topic};
use plumb_perception::LevelEvent;
use plumb_types::{
    AngleTriple, Event, EventPayload, LevelError, Lifecycle, Mode, ScreenOrientation,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};

use crate::session::{SessionController, SessionSnapshot};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Display refresh rate used when none is configured.
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

const COMMAND_CAPACITY: usize = 32;
const SOURCE: &str = "plumb-runtime::frame_loop";

// ─────────────────────────────────────────────────────────────────────────────
// Commands & handle
// ─────────────────────────────────────────────────────────────────────────────

/// Operator input accepted by a running [`FrameLoop`].
#[derive(Debug)]
pub enum Command {
    SetMode(Mode),
    ToggleHold,
    ToggleFeedback,
    Calibrate,
    /// The viewport was resized or rotated.
    Viewport { width: u32, height: u32 },
    /// Reply with the current [`SessionSnapshot`].
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Cloneable control surface for a [`FrameLoop`].
#[derive(Clone)]
pub struct FrameLoopHandle {
    commands: mpsc::Sender<Command>,
    visibility: Arc<watch::Sender<bool>>,
    filtered: watch::Receiver<AngleTriple>,
}

impl FrameLoopHandle {
    /// Queue a command for the loop.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::Channel`] once the loop has stopped.
    pub async fn send(&self, command: Command) -> Result<(), LevelError> {
        self.commands.send(command).await.map_err(closed)
    }

    /// Blocking variant of [`send`][Self::send] for threads outside the
    /// runtime, such as a stdin reader.  Must not be called from async code.
    pub fn send_blocking(&self, command: Command) -> Result<(), LevelError> {
        self.commands.blocking_send(command).map_err(closed)
    }

    /// Ask the loop for a snapshot of its session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, LevelError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(closed)
    }

    /// Blocking variant of [`snapshot`][Self::snapshot].
    pub fn snapshot_blocking(&self) -> Result<SessionSnapshot, LevelError> {
        let (tx, rx) = oneshot::channel();
        self.send_blocking(Command::Snapshot(tx))?;
        rx.blocking_recv().map_err(closed)
    }

    /// Report whether the host is currently visible.
    pub fn set_visible(&self, visible: bool) {
        self.visibility.send_replace(visible);
    }

    /// The latest filtered reading.
    pub fn filtered(&self) -> AngleTriple {
        *self.filtered.borrow()
    }

    /// A receiver that is notified whenever the filtered reading changes.
    pub fn watch_filtered(&self) -> watch::Receiver<AngleTriple> {
        self.filtered.clone()
    }
}

fn closed<E>(_: E) -> LevelError {
    LevelError::Channel("frame loop stopped".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Drives a [`SessionController`] from a sensor, a clock and operator input.
pub struct FrameLoop<S, R> {
    session: SessionController,
    sensor: S,
    sink: R,
    bus: EventBus,
    period: Duration,
    orientation: ScreenOrientation,
    gate: PermissionGate,
    display: DisplayLifecycle,
    commands: mpsc::Receiver<Command>,
    visibility: watch::Receiver<bool>,
    filtered: watch::Sender<AngleTriple>,
}

impl<S, R> FrameLoop<S, R>
where
    S: SensorSource,
    R: RenderSink,
{
    /// Build a loop and its control handle.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::InvalidConfig`] when `frame_rate_hz` is zero.
    pub fn new(
        session: SessionController,
        sensor: S,
        sink: R,
        bus: EventBus,
        frame_rate_hz: u32,
    ) -> Result<(Self, FrameLoopHandle), LevelError> {
        if frame_rate_hz == 0 {
            return Err(LevelError::InvalidConfig(
                "frame rate must be at least 1 Hz".to_string(),
            ));
        }

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (visibility_tx, visibility_rx) = watch::channel(true);
        let (filtered_tx, filtered_rx) = watch::channel(session.filtered());

        let handle = FrameLoopHandle {
            commands: command_tx,
            visibility: Arc::new(visibility_tx),
            filtered: filtered_rx,
        };

        let frame_loop = Self {
            session,
            sensor,
            sink,
            bus,
            period: Duration::from_secs(1) / frame_rate_hz,
            orientation: ScreenOrientation::Portrait,
            gate: PermissionGate::new(),
            display: DisplayLifecycle::new(),
            commands: command_rx,
            visibility: visibility_rx,
            filtered: filtered_tx,
        };

        Ok((frame_loop, handle))
    }

    /// Run until [`Command::Shutdown`] or until every handle is dropped.
    ///
    /// Returns the final session snapshot.
    ///
    /// # Errors
    ///
    /// [`LevelError::PermissionDenied`] or [`LevelError::UnsupportedDevice`]
    /// when the permission gate does not open.  Nothing is rendered.
    #[instrument(level = "info", skip_all)]
    pub async fn run(mut self) -> Result<SessionSnapshot, LevelError> {
        if let Err(e) = self.gate.acquire(&mut self.sensor).await {
            warn!(error = %e, "level pipeline not started");
            self.publish(
                Topic::SystemAlerts,
                EventPayload::Fault {
                    component: "permission_gate".to_string(),
                    message: e.to_string(),
                },
            );
            return Err(e);
        }
        self.milestone(Some(Lifecycle::PermissionGranted));

        let mut samples = self.sensor.samples();
        let mut sensor_live = true;
        let mut visibility_live = true;

        let visible = *self.visibility.borrow_and_update();
        self.display.set_visible(visible);
        let started = self.display.start();
        self.milestone(started);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                sample = samples.next(), if sensor_live => match sample {
                    Some(raw) => {
                        self.session.on_sample(&raw, self.orientation);
                        self.filtered.send_replace(self.session.filtered());
                    }
                    None => {
                        warn!("sensor stream ended; display keeps the last reading");
                        sensor_live = false;
                    }
                },
                _ = ticker.tick(), if self.display.is_ticking() => self.render_tick(),
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                changed = self.visibility.changed(), if visibility_live => match changed {
                    Ok(()) => {
                        let visible = *self.visibility.borrow_and_update();
                        let milestone = self.display.set_visible(visible);
                        if milestone == Some(Lifecycle::Resumed) {
                            ticker.reset();
                        }
                        self.milestone(milestone);
                    }
                    Err(_) => visibility_live = false,
                },
            }
        }

        let stopped = self.display.stop();
        self.milestone(stopped);
        Ok(self.session.snapshot())
    }

    fn render_tick(&mut self) {
        let outcome = self.session.tick_detailed();
        self.sink.render(&outcome.frame);
        self.publish(Topic::Frames, EventPayload::Frame(outcome.frame));

        if outcome.event == LevelEvent::BecameLevel {
            self.publish(
                Topic::Feedback,
                EventPayload::BecameLevel {
                    mode: outcome.frame.mode,
                    display_angle: outcome.frame.display_angle,
                },
            );
        }
        if let Some(report) = outcome.feedback {
            self.publish(
                Topic::Feedback,
                EventPayload::FeedbackFired {
                    haptic: report.haptic,
                    tone: report.tone,
                },
            );
        }
    }

    fn apply(&mut self, command: Command) {
        debug!(?command, "command received");
        match command {
            Command::SetMode(mode) => self.session.set_mode(mode),
            Command::ToggleHold => {
                self.session.toggle_hold();
            }
            Command::ToggleFeedback => {
                self.session.toggle_feedback();
            }
            Command::Calibrate => self.session.calibrate(),
            Command::Viewport { width, height } => {
                let orientation = ScreenOrientation::from_viewport(width, height);
                if orientation != self.orientation {
                    info!(?orientation, width, height, "screen orientation changed");
                }
                self.orientation = orientation;
            }
            Command::Snapshot(reply) => {
                // The requester may have given up waiting.
                let _ = reply.send(self.session.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn milestone(&self, milestone: Option<Lifecycle>) {
        if let Some(milestone) = milestone {
            self.publish(Topic::SystemAlerts, EventPayload::Lifecycle(milestone));
        }
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        let _ = self.bus.publish_to(topic, Event::new(SOURCE, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use plumb_hal::FeedbackDispatcher;
    use plumb_hal::sim::SimHaptic;
    use plumb_middleware::{ChannelSensor, RecordingSink, SampleInjector};
    use plumb_types::RawSample;
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, timeout};

    // Tests that wait on ticks run with the clock paused; sleeps then
    // advance virtual time only.
    const TEST_RATE_HZ: u32 = 100;

    struct Harness {
        handle: FrameLoopHandle,
        injector: SampleInjector,
        sink: RecordingSink,
        bus: EventBus,
        task: JoinHandle<Result<SessionSnapshot, LevelError>>,
    }

    fn spawn_with(session: SessionController) -> Harness {
        let (sensor, injector) = ChannelSensor::new();
        let sink = RecordingSink::new();
        let bus = EventBus::default();
        let (frame_loop, handle) =
            FrameLoop::new(session, sensor, sink.clone(), bus.clone(), TEST_RATE_HZ).unwrap();
        Harness {
            handle,
            injector,
            sink,
            bus,
            task: tokio::spawn(frame_loop.run()),
        }
    }

    fn spawn_default() -> Harness {
        spawn_with(SessionController::new(
            SessionConfig::default(),
            FeedbackDispatcher::default(),
        ))
    }

    async fn next_filtered(rx: &mut watch::Receiver<AngleTriple>) -> AngleTriple {
        timeout(Duration::from_secs(1), rx.changed())
            .await
            .expect("filtered value never changed")
            .unwrap();
        *rx.borrow_and_update()
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        let (sensor, _injector) = ChannelSensor::new();
        let session = SessionController::new(SessionConfig::default(), FeedbackDispatcher::default());
        let result = FrameLoop::new(session, sensor, RecordingSink::new(), EventBus::default(), 0);
        assert!(matches!(result, Err(LevelError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn denied_permission_never_renders() {
        let (sensor, injector) = ChannelSensor::new();
        let sink = RecordingSink::new();
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
        let session = SessionController::new(SessionConfig::default(), FeedbackDispatcher::default());
        let (frame_loop, _handle) =
            FrameLoop::new(session, sensor.denied(), sink.clone(), bus, TEST_RATE_HZ).unwrap();

        let _ = injector.send(RawSample::new(0.0, 0.0, 0.0));
        let result = frame_loop.run().await;

        assert_eq!(result.unwrap_err(), LevelError::PermissionDenied);
        assert!(sink.is_empty());
        let alert = alerts.try_recv().expect("fault alert");
        assert!(matches!(alert.payload, EventPayload::Fault { .. }));
    }

    #[tokio::test]
    async fn unsupported_device_never_renders() {
        let (sensor, _injector) = ChannelSensor::new();
        let sink = RecordingSink::new();
        let session = SessionController::new(SessionConfig::default(), FeedbackDispatcher::default());
        let (frame_loop, _handle) = FrameLoop::new(
            session,
            sensor.unsupported(),
            sink.clone(),
            EventBus::default(),
            TEST_RATE_HZ,
        )
        .unwrap();

        assert_eq!(frame_loop.run().await.unwrap_err(), LevelError::UnsupportedDevice);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn ticks_render_and_publish_frames() {
        let h = spawn_default();
        let mut frames = h.bus.subscribe_to(Topic::Frames);

        let event = timeout(Duration::from_secs(1), frames.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event.payload, EventPayload::Frame(_)));
        assert!(!h.sink.is_empty());

        h.handle.send(Command::Shutdown).await.unwrap();
        let snapshot = h.task.await.unwrap().unwrap();
        assert_eq!(snapshot.mode, Mode::Horizontal);
    }

    #[tokio::test]
    async fn samples_update_the_filtered_watch() {
        let h = spawn_default();
        let mut filtered = h.handle.watch_filtered();

        h.injector.send(RawSample::new(0.0, 10.0, 0.0)).unwrap();
        let value = next_filtered(&mut filtered).await;
        assert!((value.y - 2.0).abs() < 1e-9);
        assert_eq!(h.handle.filtered(), value);

        h.handle.send(Command::Shutdown).await.unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn commands_reach_the_session() {
        let h = spawn_default();

        h.handle.send(Command::SetMode(Mode::Vertical)).await.unwrap();
        h.handle.send(Command::ToggleHold).await.unwrap();
        h.handle.send(Command::ToggleFeedback).await.unwrap();

        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.mode, Mode::Vertical);
        assert!(snapshot.holding);
        assert!(!snapshot.feedback_enabled);

        h.handle.send(Command::Shutdown).await.unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn viewport_change_remaps_axes() {
        let config = SessionConfig::new(1.0, 0.2).unwrap();
        let h = spawn_with(SessionController::new(config, FeedbackDispatcher::default()));
        let mut filtered = h.handle.watch_filtered();

        h.handle
            .send(Command::Viewport {
                width: 800,
                height: 400,
            })
            .await
            .unwrap();
        // Commands are handled in order, so the viewport change has landed
        // once the snapshot comes back.
        h.handle.snapshot().await.unwrap();

        h.injector.send(RawSample::new(10.0, 20.0, 30.0)).unwrap();
        assert_eq!(
            next_filtered(&mut filtered).await,
            AngleTriple::new(-20.0, 10.0, 30.0)
        );

        h.handle.send(Command::Shutdown).await.unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn calibrate_command_zeroes_the_display() {
        let config = SessionConfig::new(1.0, 0.2).unwrap();
        let h = spawn_with(SessionController::new(config, FeedbackDispatcher::default()));
        let mut filtered = h.handle.watch_filtered();

        h.injector.send(RawSample::new(0.0, 12.0, 0.0)).unwrap();
        next_filtered(&mut filtered).await;
        h.handle.send(Command::Calibrate).await.unwrap();
        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.calibration.y, 12.0);

        sleep(Duration::from_millis(50)).await;
        let frame = h.sink.last().unwrap();
        assert!(frame.display_angle.abs() < 1e-9);
        assert!(frame.is_level);

        h.handle.send(Command::Shutdown).await.unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_host_stops_ticks() {
        let h = spawn_default();
        let mut alerts = h.bus.subscribe_to(Topic::SystemAlerts);
        sleep(Duration::from_millis(50)).await;

        h.handle.set_visible(false);
        sleep(Duration::from_millis(50)).await;
        let frozen = h.sink.len();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(h.sink.len(), frozen, "no ticks while hidden");

        h.handle.set_visible(true);
        sleep(Duration::from_millis(100)).await;
        // 100 ms at 100 Hz is about ten frames.
        assert!(h.sink.len() >= frozen + 9, "ticks resume when shown");

        let mut seen = Vec::new();
        while let Some(event) = alerts.try_recv() {
            if let EventPayload::Lifecycle(l) = event.payload {
                seen.push(l);
            }
        }
        assert_eq!(
            seen,
            vec![
                Lifecycle::PermissionGranted,
                Lifecycle::Started,
                Lifecycle::Suspended,
                Lifecycle::Resumed,
            ]
        );

        h.handle.send(Command::Shutdown).await.unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn level_entry_fires_feedback_once() {
        let haptic = SimHaptic::new("vibrator");
        let pulses = haptic.recorder();
        let session = SessionController::new(
            SessionConfig::default(),
            FeedbackDispatcher::default().with_haptic(Box::new(haptic)),
        );
        let h = spawn_with(session);
        let mut feedback = h.bus.subscribe_to(Topic::Feedback);

        // The initial reading is exactly level, so the first tick is an entry.
        sleep(Duration::from_millis(100)).await;
        assert_eq!(pulses.lock().unwrap().len(), 1);

        let first = feedback.try_recv().expect("became-level event");
        assert!(matches!(first.payload, EventPayload::BecameLevel { .. }));
        let second = feedback.try_recv().expect("feedback-fired event");
        assert!(matches!(
            second.payload,
            EventPayload::FeedbackFired {
                haptic: true,
                tone: false
            }
        ));
        assert!(feedback.try_recv().is_none());

        h.handle.send(Command::Shutdown).await.unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_loop() {
        let h = spawn_default();
        drop(h.handle);
        let snapshot = timeout(Duration::from_secs(1), h.task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(!snapshot.holding);
    }
}
