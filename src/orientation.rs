use crate::hardware::{Gravity, MotionSensor};
use crate::photo::Rotation;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Shortest sampling period; a zero interval would stall the ticker
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// Coarse device orientation derived from gravity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Up,
    Left,
    Down,
    Right,
}

/// Orientation tag written into recorded video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl Orientation {
    pub fn video_orientation(&self) -> VideoOrientation {
        match self {
            Orientation::Up => VideoOrientation::Portrait,
            Orientation::Left => VideoOrientation::LandscapeRight,
            Orientation::Down => VideoOrientation::PortraitUpsideDown,
            Orientation::Right => VideoOrientation::LandscapeLeft,
        }
    }

    /// Clockwise rotation that turns a sensor-oriented photo upright
    pub fn photo_rotation(&self) -> Option<Rotation> {
        match self {
            Orientation::Up => None,
            Orientation::Left => Some(Rotation::Rotate270),
            Orientation::Down => Some(Rotation::Rotate180),
            Orientation::Right => Some(Rotation::Rotate90),
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Orientation::Up => 0,
            Orientation::Left => 1,
            Orientation::Down => 2,
            Orientation::Right => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Orientation::Left,
            2 => Orientation::Down,
            3 => Orientation::Right,
            _ => Orientation::Up,
        }
    }
}

/// Reduce a gravity sample to an orientation bucket.
///
/// Within 45° of either half of the x axis the device is on its side (right
/// when x > 0), otherwise it is upright or upside down (down when y > 0).
/// A missing sample resolves to `Up`.
pub fn resolve_orientation(gravity: Option<Gravity>) -> Orientation {
    let Some(gravity) = gravity else {
        return Orientation::Up;
    };

    let angle = gravity.y.atan2(gravity.x).abs();
    let on_side = angle < FRAC_PI_4 || angle > PI - FRAC_PI_4;

    if on_side {
        if gravity.x > 0.0 {
            Orientation::Right
        } else {
            Orientation::Left
        }
    } else if gravity.y > 0.0 {
        Orientation::Down
    } else {
        Orientation::Up
    }
}

/// Latest orientation, single slot, last write wins
#[derive(Debug, Default)]
pub struct OrientationSlot {
    value: AtomicU8,
}

impl OrientationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, orientation: Orientation) {
        self.value.store(orientation.to_u8(), Ordering::Release);
    }

    pub fn load(&self) -> Orientation {
        Orientation::from_u8(self.value.load(Ordering::Acquire))
    }
}

struct Sampler {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Periodic motion sampling that keeps the orientation slot current
pub struct OrientationFusion {
    sensor: Arc<dyn MotionSensor>,
    slot: Arc<OrientationSlot>,
    interval: Duration,
    sampler: Mutex<Option<Sampler>>,
}

impl OrientationFusion {
    pub fn new(sensor: Arc<dyn MotionSensor>, interval: Duration) -> Self {
        Self {
            sensor,
            slot: Arc::new(OrientationSlot::new()),
            interval: interval.max(MIN_SAMPLE_INTERVAL),
            sampler: Mutex::new(None),
        }
    }

    /// Begin sampling on a background task. Must be called within a tokio runtime.
    pub fn start_updates(&self) {
        if !self.sensor.is_available() {
            warn!("Device motion is not available; orientation stays {:?}", self.latest());
            return;
        }

        let mut sampler = self.sampler.lock();
        if sampler.is_some() {
            debug!("Orientation updates already running");
            return;
        }

        let token = CancellationToken::new();
        let task_token = token.clone();
        let sensor = Arc::clone(&self.sensor);
        let slot = Arc::clone(&self.slot);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let orientation = resolve_orientation(sensor.gravity());
                        trace!("Orientation sample: {:?}", orientation);
                        slot.store(orientation);
                    }
                }
            }

            debug!("Orientation sampling loop stopped");
        });

        info!("Orientation updates started ({}ms interval)", interval.as_millis());
        *sampler = Some(Sampler {
            token,
            _handle: handle,
        });
    }

    pub fn stop_updates(&self) {
        if let Some(sampler) = self.sampler.lock().take() {
            sampler.token.cancel();
            info!("Orientation updates stopped");
        }
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.lock().is_some()
    }

    pub fn latest(&self) -> Orientation {
        self.slot.load()
    }

    pub fn slot(&self) -> Arc<OrientationSlot> {
        Arc::clone(&self.slot)
    }
}

impl Drop for OrientationFusion {
    fn drop(&mut self) {
        if let Some(sampler) = self.sampler.get_mut().take() {
            sampler.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimulatedMotion;

    fn at_degrees(degrees: f64) -> Gravity {
        let radians = degrees.to_radians();
        Gravity::new(radians.cos(), radians.sin(), 0.0)
    }

    #[test]
    fn test_missing_sample_defaults_to_up() {
        assert_eq!(resolve_orientation(None), Orientation::Up);
    }

    #[test]
    fn test_right_inside_the_x_positive_wedge() {
        for degrees in [-44.9, -30.0, -1.0, 0.0, 1.0, 30.0, 44.9] {
            assert_eq!(
                resolve_orientation(Some(at_degrees(degrees))),
                Orientation::Right,
                "angle {}",
                degrees
            );
        }
    }

    #[test]
    fn test_buckets_partition_the_circle() {
        let mut seen = std::collections::HashSet::new();
        let mut degrees: f64 = -179.75;
        while degrees < 180.0 {
            let expected = if degrees.abs() < 45.0 {
                Orientation::Right
            } else if degrees.abs() > 135.0 {
                Orientation::Left
            } else if degrees > 0.0 {
                Orientation::Down
            } else {
                Orientation::Up
            };
            let resolved = resolve_orientation(Some(at_degrees(degrees)));
            assert_eq!(resolved, expected, "angle {}", degrees);
            seen.insert(resolved);
            degrees += 0.5;
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_canonical_poses() {
        assert_eq!(
            resolve_orientation(Some(Gravity::new(0.0, -1.0, 0.0))),
            Orientation::Up
        );
        assert_eq!(
            resolve_orientation(Some(Gravity::new(0.0, 1.0, 0.0))),
            Orientation::Down
        );
        assert_eq!(
            resolve_orientation(Some(Gravity::new(1.0, 0.0, 0.0))),
            Orientation::Right
        );
        // Exactly on the 45° boundary falls into the vertical buckets
        assert_eq!(
            resolve_orientation(Some(Gravity::new(1.0, 1.0, 0.0))),
            Orientation::Down
        );
        assert_eq!(
            resolve_orientation(Some(Gravity::new(1.0, -1.0, 0.0))),
            Orientation::Up
        );
    }

    #[test]
    fn test_left_when_lying_on_the_other_side() {
        assert_eq!(
            resolve_orientation(Some(Gravity::new(-1.0, 0.0, 0.0))),
            Orientation::Left
        );
        assert_eq!(
            resolve_orientation(Some(Gravity::new(-1.0, 0.1, 0.0))),
            Orientation::Left
        );
        assert_eq!(
            resolve_orientation(Some(Gravity::new(-1.0, -0.1, 0.0))),
            Orientation::Left
        );
    }

    #[test]
    fn test_video_and_photo_mappings() {
        assert_eq!(Orientation::Up.video_orientation(), VideoOrientation::Portrait);
        assert_eq!(Orientation::Left.video_orientation(), VideoOrientation::LandscapeRight);
        assert_eq!(
            Orientation::Down.video_orientation(),
            VideoOrientation::PortraitUpsideDown
        );
        assert_eq!(Orientation::Right.video_orientation(), VideoOrientation::LandscapeLeft);

        assert_eq!(Orientation::Up.photo_rotation(), None);
        assert_eq!(Orientation::Right.photo_rotation(), Some(Rotation::Rotate90));
        assert_eq!(Orientation::Left.photo_rotation(), Some(Rotation::Rotate270));
    }

    #[test]
    fn test_slot_last_write_wins() {
        let slot = OrientationSlot::new();
        assert_eq!(slot.load(), Orientation::Up);
        slot.store(Orientation::Left);
        slot.store(Orientation::Right);
        assert_eq!(slot.load(), Orientation::Right);
    }

    #[tokio::test]
    async fn test_fusion_publishes_latest_sample() {
        let sensor = Arc::new(SimulatedMotion::new());
        sensor.set_gravity(Some(Gravity::new(0.9, 0.1, 0.0)));

        let fusion = OrientationFusion::new(sensor.clone(), Duration::from_millis(10));
        fusion.start_updates();
        assert!(fusion.is_sampling());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fusion.latest(), Orientation::Right);

        sensor.set_gravity(Some(Gravity::new(0.0, 1.0, 0.0)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fusion.latest(), Orientation::Down);

        sensor.set_gravity(Some(Gravity::new(-0.95, 0.2, 0.0)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fusion.latest(), Orientation::Left);
        sensor.set_gravity(Some(Gravity::new(0.0, 1.0, 0.0)));
        tokio::time::sleep(Duration::from_millis(50)).await;

        fusion.stop_updates();
        assert!(!fusion.is_sampling());
        tokio::time::sleep(Duration::from_millis(20)).await;

        sensor.set_gravity(Some(Gravity::new(-1.0, 0.0, 0.0)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fusion.latest(), Orientation::Down);
    }

    #[tokio::test]
    async fn test_unavailable_sensor_never_samples() {
        let fusion = OrientationFusion::new(
            Arc::new(SimulatedMotion::unavailable()),
            Duration::from_millis(10),
        );
        fusion.start_updates();
        assert!(!fusion.is_sampling());
        assert_eq!(fusion.latest(), Orientation::Up);
    }

    #[tokio::test]
    async fn test_zero_interval_still_samples() {
        let sensor = Arc::new(SimulatedMotion::new());
        sensor.set_gravity(Some(Gravity::new(0.0, 1.0, 0.0)));

        let fusion = OrientationFusion::new(sensor, Duration::ZERO);
        fusion.start_updates();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fusion.latest(), Orientation::Down);
        fusion.stop_updates();
    }
}
