use crate::config::{FlashMode, SessionPreset, StabilizationMode};
use crate::error::{HardwareError, MediaKind};
use crate::orientation::VideoOrientation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Physical placement of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraPosition {
    Back,
    Front,
}

impl CameraPosition {
    pub fn opposite(self) -> Self {
        match self {
            CameraPosition::Back => CameraPosition::Front,
            CameraPosition::Front => CameraPosition::Back,
        }
    }
}

/// Inclusive range of frame rates a format can deliver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRateRange {
    pub min: f64,
    pub max: f64,
}

impl FrameRateRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, rate: f64) -> bool {
        rate >= self.min && rate <= self.max
    }
}

/// A capture format advertised by a camera
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFormat {
    pub width: u32,
    pub height: u32,
    pub frame_rate_ranges: Vec<FrameRateRange>,
    pub stabilization_modes: Vec<StabilizationMode>,
    pub max_zoom_factor: f64,
}

impl DeviceFormat {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn supports_frame_rate(&self, rate: f64) -> bool {
        self.frame_rate_ranges.iter().any(|range| range.contains(rate))
    }

    /// `Off` is accepted by every format.
    pub fn supports_stabilization(&self, mode: StabilizationMode) -> bool {
        mode == StabilizationMode::Off || self.stabilization_modes.contains(&mode)
    }
}

/// Point of interest in normalized device coordinates, (0,0) top-left to (1,1) bottom-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

impl FocusPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn center() -> Self {
        Self { x: 0.5, y: 0.5 }
    }

    pub fn clamped(&self) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 };
        Self {
            x: clamp(self.x),
            y: clamp(self.y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Locked,
    AutoFocus,
    ContinuousAutoFocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    Locked,
    AutoExpose,
    ContinuousAutoExposure,
}

/// What a camera can do for focus and exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusCapabilities {
    pub continuous_auto_focus: bool,
    pub focus_point_of_interest: bool,
    pub continuous_auto_exposure: bool,
    pub exposure_point_of_interest: bool,
    pub smooth_auto_focus: bool,
}

impl Default for FocusCapabilities {
    fn default() -> Self {
        Self {
            continuous_auto_focus: true,
            focus_point_of_interest: true,
            continuous_auto_exposure: true,
            exposure_point_of_interest: true,
            smooth_auto_focus: true,
        }
    }
}

/// Camera device handle.
///
/// Every `set_*` call must happen between `lock_for_configuration` and
/// `unlock_for_configuration`; use [`crate::hardware::DeviceConfigLock`].
pub trait VideoDevice: Send + Sync {
    fn id(&self) -> &str;
    fn position(&self) -> CameraPosition;
    fn formats(&self) -> Vec<DeviceFormat>;
    fn active_format(&self) -> Option<DeviceFormat>;
    fn focus_capabilities(&self) -> FocusCapabilities;

    /// Current zoom factor
    fn zoom_factor(&self) -> f64;
    /// Zoom capability of the active format
    fn max_zoom_factor(&self) -> f64;

    fn lock_for_configuration(&self) -> Result<(), HardwareError>;
    fn unlock_for_configuration(&self);

    fn set_active_format(&self, format: &DeviceFormat, frame_duration: Duration);
    fn set_zoom_factor(&self, factor: f64);
    fn set_focus_mode(&self, mode: FocusMode);
    fn set_focus_point_of_interest(&self, point: FocusPoint);
    fn set_exposure_mode(&self, mode: ExposureMode);
    fn set_exposure_point_of_interest(&self, point: FocusPoint);
    fn set_smooth_auto_focus(&self, enabled: bool);
    fn set_subject_area_monitoring(&self, enabled: bool);
}

/// Microphone device handle
pub trait AudioDevice: Send + Sync {
    fn id(&self) -> &str;
}

/// Input attached to the capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub kind: MediaKind,
    pub device_id: String,
}

impl DeviceInput {
    pub fn camera(device: &dyn VideoDevice) -> Self {
        Self {
            kind: MediaKind::Camera,
            device_id: device.id().to_string(),
        }
    }

    pub fn microphone(device: &dyn AudioDevice) -> Self {
        Self {
            kind: MediaKind::Microphone,
            device_id: device.id().to_string(),
        }
    }
}

/// Outputs wired to the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Photo,
    Movie,
}

/// Per-output video connection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub stabilization: Option<StabilizationMode>,
    pub mirrored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSettings {
    pub flash_mode: FlashMode,
    pub still_stabilization: bool,
    pub high_resolution: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingRequest {
    pub path: PathBuf,
    pub orientation: VideoOrientation,
    pub max_duration: Duration,
}

/// Platform capture session plus device discovery.
///
/// Configuration calls (`set_preset`, `add_input`, `remove_input`,
/// `add_output`, `configure_connection`) are made inside a
/// `begin_configuration`/`commit_configuration` pair; use
/// [`crate::hardware::ConfigurationBracket`].
#[async_trait]
pub trait CaptureHardware: Send + Sync {
    fn discover_camera(&self, position: CameraPosition) -> Option<Arc<dyn VideoDevice>>;
    fn discover_microphone(&self) -> Option<Arc<dyn AudioDevice>>;

    fn begin_configuration(&self);
    fn commit_configuration(&self);

    fn can_set_preset(&self, preset: SessionPreset) -> bool;
    fn set_preset(&self, preset: SessionPreset);
    fn add_input(&self, input: &DeviceInput) -> Result<(), HardwareError>;
    fn remove_input(&self, input: &DeviceInput);
    fn has_output(&self, output: OutputKind) -> bool;
    fn add_output(&self, output: OutputKind) -> Result<(), HardwareError>;
    fn configure_connection(&self, output: OutputKind, settings: ConnectionSettings);
    fn supports_still_stabilization(&self) -> bool;

    fn start_running(&self) -> Result<(), HardwareError>;
    fn stop_running(&self);
    fn is_running(&self) -> bool;

    /// Capture one still and return its encoded bytes
    async fn capture_photo(&self, settings: PhotoSettings) -> Result<Vec<u8>, HardwareError>;

    async fn start_recording(&self, request: RecordingRequest) -> Result<(), HardwareError>;
    /// Finalize the active recording and return the written file
    async fn stop_recording(&self) -> Result<PathBuf, HardwareError>;
    fn is_recording(&self) -> bool;
}

/// Gravity components in device coordinates, in g
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Gravity {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Inertial sensor source
pub trait MotionSensor: Send + Sync {
    fn is_available(&self) -> bool;
    /// Latest gravity sample, if the sensor produced one
    fn gravity(&self) -> Option<Gravity>;
}
