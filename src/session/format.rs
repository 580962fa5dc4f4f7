use crate::config::{CaptureConfig, SessionPreset};
use crate::hardware::{CaptureHardware, DeviceFormat};
use std::time::Duration;
use tracing::{debug, warn};

/// Pick the camera format for `config`.
///
/// A candidate must match the preset's pixel dimensions exactly, cover the
/// configured frame rate and support the configured stabilization mode.
/// Among candidates the last one enumerated wins.
pub fn negotiate_format(formats: &[DeviceFormat], config: &CaptureConfig) -> Option<DeviceFormat> {
    let dimensions = config.preset.dimensions();

    let chosen = formats
        .iter()
        .filter(|format| format.dimensions() == dimensions)
        .filter(|format| format.supports_frame_rate(config.frame_rate))
        .filter(|format| format.supports_stabilization(config.stabilization_mode))
        .last()
        .cloned();

    match &chosen {
        Some(format) => debug!(
            "Negotiated format {}x{} ({:?}, max zoom {}) for {} fps with {:?} stabilization",
            format.width,
            format.height,
            format.frame_rate_ranges,
            format.max_zoom_factor,
            config.frame_rate,
            config.stabilization_mode
        ),
        None => debug!(
            "No format of {} matches {:?} at {} fps with {:?} stabilization",
            formats.len(),
            config.preset,
            config.frame_rate,
            config.stabilization_mode
        ),
    }

    chosen
}

/// Fixed frame duration for `frame_rate`
pub fn frame_duration(frame_rate: f64) -> Duration {
    Duration::from_secs_f64(1.0 / frame_rate.max(1.0))
}

/// The configured preset when the session accepts it, otherwise the fallback
pub fn select_preset(hardware: &dyn CaptureHardware, preset: SessionPreset) -> SessionPreset {
    if hardware.can_set_preset(preset) {
        preset
    } else {
        warn!(
            "Session preset {:?} is not supported, falling back to {:?}",
            preset,
            SessionPreset::FALLBACK
        );
        SessionPreset::FALLBACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StabilizationMode;
    use crate::hardware::{FrameRateRange, SimulatedHardware};

    fn format(width: u32, height: u32, max_rate: f64, modes: Vec<StabilizationMode>, zoom: f64) -> DeviceFormat {
        DeviceFormat {
            width,
            height,
            frame_rate_ranges: vec![FrameRateRange::new(1.0, max_rate)],
            stabilization_modes: modes,
            max_zoom_factor: zoom,
        }
    }

    fn config(preset: SessionPreset, frame_rate: f64, mode: StabilizationMode) -> CaptureConfig {
        CaptureConfig {
            preset,
            frame_rate,
            stabilization_mode: mode,
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn test_format_matching_all_three_criteria_wins() {
        let a = format(1920, 1080, 60.0, vec![], 10.0);
        let b = format(1920, 1080, 60.0, vec![StabilizationMode::Cinematic], 12.0);
        let wanted = config(SessionPreset::Hd1920x1080, 60.0, StabilizationMode::Cinematic);

        assert_eq!(negotiate_format(&[a.clone(), b.clone()], &wanted), Some(b.clone()));
        assert_eq!(negotiate_format(&[b.clone(), a], &wanted), Some(b));
    }

    #[test]
    fn test_last_enumerated_match_wins() {
        let first = format(1280, 720, 60.0, vec![], 4.0);
        let second = format(1280, 720, 120.0, vec![], 6.0);
        let wanted = config(SessionPreset::Hd1280x720, 30.0, StabilizationMode::Off);

        let chosen = negotiate_format(&[first, second], &wanted).unwrap();
        assert_eq!(chosen.max_zoom_factor, 6.0);
    }

    #[test]
    fn test_no_candidate_when_rate_or_size_misses() {
        let formats = vec![
            format(1920, 1080, 30.0, vec![], 10.0),
            format(3840, 2160, 60.0, vec![], 10.0),
        ];
        let wanted = config(SessionPreset::Hd1920x1080, 60.0, StabilizationMode::Off);
        assert_eq!(negotiate_format(&formats, &wanted), None);
        assert_eq!(negotiate_format(&[], &wanted), None);
    }

    #[test]
    fn test_frame_rate_range_bounds_are_inclusive() {
        let formats = vec![format(640, 480, 30.0, vec![], 2.0)];
        let wanted = config(SessionPreset::Vga640x480, 30.0, StabilizationMode::Off);
        assert!(negotiate_format(&formats, &wanted).is_some());
    }

    #[test]
    fn test_frame_duration() {
        assert_eq!(frame_duration(50.0), Duration::from_millis(20));
        assert_eq!(frame_duration(0.0), Duration::from_secs(1));
    }

    #[test]
    fn test_preset_fallback() {
        let hardware = SimulatedHardware::new().with_supported_presets(vec![
            SessionPreset::Hd1280x720,
            SessionPreset::Hd1920x1080,
        ]);

        assert_eq!(
            select_preset(&hardware, SessionPreset::Hd1280x720),
            SessionPreset::Hd1280x720
        );
        assert_eq!(
            select_preset(&hardware, SessionPreset::Hd4k3840x2160),
            SessionPreset::Hd1920x1080
        );
    }
}
