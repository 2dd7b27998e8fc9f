//! Simulated tilt sensor for the terminal host.
//!
//! A real orientation sensor reports continuously even when the device is
//! still.  [`run_device`] reproduces that: it re-sends the most recent pose
//! set from the REPL at [`SAMPLE_RATE_HZ`] until either side goes away.

use std::time::Duration;

use plumb_middleware::SampleInjector;
use plumb_types::RawSample;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// How often the simulated sensor reports.
pub const SAMPLE_RATE_HZ: u32 = 50;

/// Stream `pose` into `injector` until the REPL or the sensor stream closes.
///
/// Returns the number of samples delivered.
pub async fn run_device(mut pose: watch::Receiver<RawSample>, injector: SampleInjector) -> u64 {
    let mut ticker = interval(Duration::from_secs(1) / SAMPLE_RATE_HZ);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sent = 0u64;

    info!(rate_hz = SAMPLE_RATE_HZ, "simulated sensor started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sample = *pose.borrow();
                if injector.send(sample).is_err() {
                    debug!("sensor stream closed");
                    break;
                }
                sent += 1;
            }
            changed = pose.changed() => {
                if changed.is_err() {
                    debug!("pose source closed");
                    break;
                }
                let sample = *pose.borrow_and_update();
                debug!(?sample, "pose updated");
            }
        }
    }
    info!(sent, "simulated sensor stopped");
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use plumb_middleware::{ChannelSensor, SensorSource};

    #[tokio::test]
    async fn repeats_the_latest_pose() {
        let (mut sensor, injector) = ChannelSensor::new();
        let (pose_tx, pose_rx) = watch::channel(RawSample::new(0.0, 4.0, 0.0));
        let device = tokio::spawn(run_device(pose_rx, injector));

        let mut samples = sensor.samples();
        assert_eq!(samples.next().await, Some(RawSample::new(0.0, 4.0, 0.0)));
        assert_eq!(samples.next().await, Some(RawSample::new(0.0, 4.0, 0.0)));

        pose_tx.send_replace(RawSample::new(10.0, -2.0, 0.0));
        let mut latest = None;
        for _ in 0..20 {
            latest = samples.next().await;
            if latest == Some(RawSample::new(10.0, -2.0, 0.0)) {
                break;
            }
        }
        assert_eq!(latest, Some(RawSample::new(10.0, -2.0, 0.0)));

        drop(pose_tx);
        let sent = device.await.unwrap();
        assert!(sent >= 3);
    }

    #[tokio::test]
    async fn stops_when_the_sensor_is_dropped() {
        let (sensor, injector) = ChannelSensor::new();
        let (_pose_tx, pose_rx) = watch::channel(RawSample::default());
        drop(sensor);
        assert_eq!(run_device(pose_rx, injector).await, 0);
    }
}
