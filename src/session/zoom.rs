/// Upper bound on the zoom factor regardless of device capability
pub const ZOOM_SAFETY_CEILING: f64 = 5.0;

pub const MIN_ZOOM_FACTOR: f64 = 1.0;

/// Pinch-zoom bookkeeping for the active camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    /// Factor last applied to the device
    pub current_factor: f64,
    /// Factor captured when the current gesture began
    pub base_factor: f64,
    pub max_factor: f64,
}

impl ZoomState {
    pub fn new(device_max_zoom: f64) -> Self {
        Self {
            current_factor: MIN_ZOOM_FACTOR,
            base_factor: MIN_ZOOM_FACTOR,
            max_factor: Self::max_for_device(device_max_zoom),
        }
    }

    /// Usable maximum for a device: never above the ceiling, never below 1.0
    pub fn max_for_device(device_max_zoom: f64) -> f64 {
        if device_max_zoom.is_finite() {
            device_max_zoom.clamp(MIN_ZOOM_FACTOR, ZOOM_SAFETY_CEILING)
        } else {
            MIN_ZOOM_FACTOR
        }
    }

    /// Snapshot the device's factor as the base for the next gesture
    pub fn begin_gesture(&mut self, device_factor: f64) {
        self.base_factor = if device_factor.is_finite() {
            device_factor.clamp(MIN_ZOOM_FACTOR, self.max_factor)
        } else {
            self.current_factor
        };
    }

    /// Factor for a gesture multiplier, or `None` if the multiplier is unusable
    pub fn factor_for(&self, multiplier: f64) -> Option<f64> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return None;
        }
        Some((self.base_factor * multiplier).clamp(MIN_ZOOM_FACTOR, self.max_factor))
    }

    pub fn apply(&mut self, multiplier: f64) -> Option<f64> {
        let factor = self.factor_for(multiplier)?;
        self.current_factor = factor;
        Some(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_is_capped_by_ceiling_and_device() {
        assert_eq!(ZoomState::new(16.0).max_factor, 5.0);
        assert_eq!(ZoomState::new(3.0).max_factor, 3.0);
        assert_eq!(ZoomState::new(0.5).max_factor, 1.0);
        assert_eq!(ZoomState::new(f64::NAN).max_factor, 1.0);
    }

    #[test]
    fn test_factor_stays_within_bounds() {
        let mut zoom = ZoomState::new(8.0);
        for multiplier in [0.01, 0.5, 1.0, 2.0, 3.3, 7.0, 1e9] {
            let factor = zoom.apply(multiplier).unwrap();
            assert!((1.0..=5.0).contains(&factor), "{} -> {}", multiplier, factor);
            zoom.begin_gesture(factor);
        }
    }

    #[test]
    fn test_monotonic_in_multiplier_for_fixed_base() {
        let mut zoom = ZoomState::new(4.0);
        zoom.begin_gesture(2.0);

        let mut previous = 0.0;
        let mut multiplier = 0.1;
        while multiplier < 4.0 {
            let factor = zoom.factor_for(multiplier).unwrap();
            assert!(factor >= previous);
            previous = factor;
            multiplier += 0.05;
        }
        assert_eq!(previous, 4.0);
    }

    #[test]
    fn test_gesture_scales_from_base() {
        let mut zoom = ZoomState::new(10.0);
        zoom.begin_gesture(2.0);
        assert_eq!(zoom.apply(1.5), Some(3.0));
        // Without a new gesture the base is unchanged
        assert_eq!(zoom.apply(2.0), Some(4.0));
        assert_eq!(zoom.current_factor, 4.0);
    }

    #[test]
    fn test_unusable_multipliers_are_ignored() {
        let mut zoom = ZoomState::new(10.0);
        zoom.apply(2.0);
        assert_eq!(zoom.apply(f64::NAN), None);
        assert_eq!(zoom.apply(-1.0), None);
        assert_eq!(zoom.apply(0.0), None);
        assert_eq!(zoom.apply(f64::INFINITY), None);
        assert_eq!(zoom.current_factor, 2.0);
    }
}
