use super::*;
use crate::config::{FlashMode, SessionPreset, StabilizationMode};
use crate::error::HardwareError;
use std::sync::Arc;

fn simulated() -> Arc<SimulatedHardware> {
    Arc::new(SimulatedHardware::new())
}

#[test]
fn test_bracket_commits_on_drop() {
    let hardware = simulated();

    {
        let _bracket = ConfigurationBracket::begin(hardware.clone());
        hardware.set_preset(SessionPreset::Hd1280x720);
        assert_eq!(hardware.record().configuration_depth, 1);
    }

    let record = hardware.record();
    assert_eq!(record.configuration_depth, 0);
    assert_eq!(record.configurations_committed, 1);
    assert_eq!(record.unbracketed_changes, 0);
    assert_eq!(record.preset, Some(SessionPreset::Hd1280x720));
}

#[test]
fn test_bracket_commits_on_error_path() {
    fn configure(hardware: Arc<SimulatedHardware>) -> Result<(), HardwareError> {
        let _bracket = ConfigurationBracket::begin(hardware.clone());
        hardware.add_output(OutputKind::Photo)?;
        hardware.add_output(OutputKind::Photo)?;
        Ok(())
    }

    let hardware = simulated();
    assert!(configure(hardware.clone()).is_err());
    assert_eq!(hardware.record().configuration_depth, 0);
    assert_eq!(hardware.record().configurations_committed, 1);
}

#[test]
fn test_unbracketed_change_is_counted() {
    let hardware = simulated();
    hardware.set_preset(SessionPreset::Vga640x480);
    assert_eq!(hardware.record().unbracketed_changes, 1);
}

#[test]
fn test_device_lock_released_on_drop() {
    let hardware = simulated();
    let camera = hardware.discover_camera(CameraPosition::Back).unwrap();

    {
        let device = DeviceConfigLock::acquire(&camera).unwrap();
        device.set_zoom_factor(2.0);
        assert!(DeviceConfigLock::acquire(&camera).is_err());
    }

    let state = hardware.camera(CameraPosition::Back).unwrap().snapshot();
    assert!(!state.locked);
    assert_eq!(state.zoom_factor, 2.0);
    assert_eq!(state.unlocked_mutations, 0);
    assert!(DeviceConfigLock::acquire(&camera).is_ok());
}

#[test]
fn test_refused_lock_reports_device_locked() {
    let hardware = simulated();
    let back = hardware.camera(CameraPosition::Back).unwrap();
    back.refuse_lock(true);

    let camera = hardware.discover_camera(CameraPosition::Back).unwrap();
    match DeviceConfigLock::acquire(&camera) {
        Err(HardwareError::DeviceLocked) => {}
        other => panic!("Expected DeviceLocked, got {:?}", other.map(|_| ())),
    }
    assert!(!back.snapshot().locked);
}

#[test]
fn test_format_capability_checks() {
    let format = DeviceFormat {
        width: 1920,
        height: 1080,
        frame_rate_ranges: vec![FrameRateRange::new(2.0, 30.0)],
        stabilization_modes: vec![StabilizationMode::Standard],
        max_zoom_factor: 10.0,
    };

    assert!(format.supports_frame_rate(30.0));
    assert!(format.supports_frame_rate(2.0));
    assert!(!format.supports_frame_rate(60.0));
    assert!(format.supports_stabilization(StabilizationMode::Off));
    assert!(format.supports_stabilization(StabilizationMode::Standard));
    assert!(!format.supports_stabilization(StabilizationMode::Cinematic));
}

#[test]
fn test_focus_point_clamping() {
    assert_eq!(
        FocusPoint::new(-0.5, 1.7).clamped(),
        FocusPoint::new(0.0, 1.0)
    );
    assert_eq!(FocusPoint::new(f64::NAN, 0.25).clamped(), FocusPoint::new(0.5, 0.25));
}

#[test]
fn test_camera_position_opposite() {
    assert_eq!(CameraPosition::Back.opposite(), CameraPosition::Front);
    assert_eq!(CameraPosition::Front.opposite(), CameraPosition::Back);
}

#[tokio::test]
async fn test_simulated_photo_requires_running_session() {
    let hardware = simulated();
    let settings = PhotoSettings {
        flash_mode: FlashMode::Off,
        still_stabilization: true,
        high_resolution: true,
    };

    let result = hardware.capture_photo(settings).await;
    assert_eq!(result, Err(HardwareError::SessionNotRunning));
    assert_eq!(hardware.record().photos_captured, 0);
}

#[tokio::test]
async fn test_simulated_recording_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let hardware = simulated();
    let camera = hardware.discover_camera(CameraPosition::Back).unwrap();
    hardware
        .add_input(&DeviceInput::camera(camera.as_ref()))
        .unwrap();
    hardware.start_running().unwrap();

    let path = dir.path().join("clip.mp4");
    hardware
        .start_recording(RecordingRequest {
            path: path.clone(),
            orientation: crate::orientation::VideoOrientation::Portrait,
            max_duration: std::time::Duration::from_secs(5),
        })
        .await
        .unwrap();
    assert!(hardware.is_recording());

    let finished = hardware.stop_recording().await.unwrap();
    assert_eq!(finished, path);
    assert!(!hardware.is_recording());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
