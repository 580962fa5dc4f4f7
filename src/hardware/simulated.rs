//! In-process capture stack used when no platform backend is wired in, and by the tests.

use super::interface::{
    AudioDevice, CameraPosition, CaptureHardware, ConnectionSettings, DeviceFormat, DeviceInput,
    ExposureMode, FocusCapabilities, FocusMode, FocusPoint, FrameRateRange, Gravity,
    MotionSensor, OutputKind, PhotoSettings, RecordingRequest, VideoDevice,
};
use crate::config::{SessionPreset, StabilizationMode};
use crate::error::HardwareError;
use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

const SIMULATED_MOVIE_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom";

/// Observable state of a simulated camera
#[derive(Debug, Clone)]
pub struct CameraState {
    pub locked: bool,
    pub lock_count: u32,
    pub refuse_lock: bool,
    pub active_format: Option<DeviceFormat>,
    pub frame_duration: Option<Duration>,
    pub zoom_factor: f64,
    pub focus_mode: Option<FocusMode>,
    pub focus_point: Option<FocusPoint>,
    pub exposure_mode: Option<ExposureMode>,
    pub exposure_point: Option<FocusPoint>,
    pub smooth_auto_focus: bool,
    pub subject_area_monitoring: bool,
    /// Mutations attempted without holding the configuration lock
    pub unlocked_mutations: u32,
}

pub struct SimulatedCamera {
    id: String,
    position: CameraPosition,
    formats: Vec<DeviceFormat>,
    capabilities: FocusCapabilities,
    state: Mutex<CameraState>,
}

impl SimulatedCamera {
    pub fn new(position: CameraPosition) -> Self {
        let formats = match position {
            CameraPosition::Back => default_back_formats(),
            CameraPosition::Front => default_front_formats(),
        };
        Self::with_formats(position, formats)
    }

    pub fn with_formats(position: CameraPosition, formats: Vec<DeviceFormat>) -> Self {
        let id = match position {
            CameraPosition::Back => "simulated-back-wide".to_string(),
            CameraPosition::Front => "simulated-front-wide".to_string(),
        };

        Self {
            id,
            position,
            formats,
            capabilities: FocusCapabilities::default(),
            state: Mutex::new(CameraState {
                locked: false,
                lock_count: 0,
                refuse_lock: false,
                active_format: None,
                frame_duration: None,
                zoom_factor: 1.0,
                focus_mode: None,
                focus_point: None,
                exposure_mode: None,
                exposure_point: None,
                smooth_auto_focus: false,
                subject_area_monitoring: false,
                unlocked_mutations: 0,
            }),
        }
    }

    pub fn with_capabilities(mut self, capabilities: FocusCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Make `lock_for_configuration` fail until reset
    pub fn refuse_lock(&self, refuse: bool) {
        self.state.lock().refuse_lock = refuse;
    }

    pub fn snapshot(&self) -> CameraState {
        self.state.lock().clone()
    }

    fn mutate(&self, change: impl FnOnce(&mut CameraState)) {
        let mut state = self.state.lock();
        if !state.locked {
            state.unlocked_mutations += 1;
        }
        change(&mut state);
    }
}

impl VideoDevice for SimulatedCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> CameraPosition {
        self.position
    }

    fn formats(&self) -> Vec<DeviceFormat> {
        self.formats.clone()
    }

    fn active_format(&self) -> Option<DeviceFormat> {
        self.state.lock().active_format.clone()
    }

    fn focus_capabilities(&self) -> FocusCapabilities {
        self.capabilities
    }

    fn zoom_factor(&self) -> f64 {
        self.state.lock().zoom_factor
    }

    fn max_zoom_factor(&self) -> f64 {
        self.state
            .lock()
            .active_format
            .as_ref()
            .or_else(|| self.formats.first())
            .map(|format| format.max_zoom_factor)
            .unwrap_or(1.0)
    }

    fn lock_for_configuration(&self) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        if state.refuse_lock || state.locked {
            return Err(HardwareError::DeviceLocked);
        }
        state.locked = true;
        state.lock_count += 1;
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        self.state.lock().locked = false;
    }

    fn set_active_format(&self, format: &DeviceFormat, frame_duration: Duration) {
        self.mutate(|state| {
            state.active_format = Some(format.clone());
            state.frame_duration = Some(frame_duration);
        });
    }

    fn set_zoom_factor(&self, factor: f64) {
        self.mutate(|state| state.zoom_factor = factor);
    }

    fn set_focus_mode(&self, mode: FocusMode) {
        self.mutate(|state| state.focus_mode = Some(mode));
    }

    fn set_focus_point_of_interest(&self, point: FocusPoint) {
        self.mutate(|state| state.focus_point = Some(point));
    }

    fn set_exposure_mode(&self, mode: ExposureMode) {
        self.mutate(|state| state.exposure_mode = Some(mode));
    }

    fn set_exposure_point_of_interest(&self, point: FocusPoint) {
        self.mutate(|state| state.exposure_point = Some(point));
    }

    fn set_smooth_auto_focus(&self, enabled: bool) {
        self.mutate(|state| state.smooth_auto_focus = enabled);
    }

    fn set_subject_area_monitoring(&self, enabled: bool) {
        self.mutate(|state| state.subject_area_monitoring = enabled);
    }
}

pub struct SimulatedMicrophone {
    id: String,
}

impl SimulatedMicrophone {
    pub fn new() -> Self {
        Self {
            id: "simulated-builtin-mic".to_string(),
        }
    }
}

impl Default for SimulatedMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDevice for SimulatedMicrophone {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Observable state of the simulated capture session
#[derive(Debug, Clone, Default)]
pub struct SessionRecord {
    pub preset: Option<SessionPreset>,
    pub inputs: Vec<DeviceInput>,
    pub outputs: Vec<OutputKind>,
    pub connections: HashMap<OutputKind, ConnectionSettings>,
    pub configuration_depth: u32,
    pub configurations_committed: u32,
    /// Configuration changes made outside a begin/commit pair
    pub unbracketed_changes: u32,
    pub running: bool,
    pub start_running_calls: u32,
    pub stop_running_calls: u32,
    pub recording: Option<RecordingRequest>,
    pub recordings_started: u32,
    pub photos_captured: u32,
    pub last_photo_settings: Option<PhotoSettings>,
    pub photo_failure: Option<HardwareError>,
    pub recording_failure: Option<HardwareError>,
}

pub struct SimulatedHardware {
    cameras: Mutex<HashMap<CameraPosition, Arc<SimulatedCamera>>>,
    microphone: Mutex<Option<Arc<SimulatedMicrophone>>>,
    supported_presets: Vec<SessionPreset>,
    photo_size: (u32, u32),
    photo_delay: Duration,
    state: Mutex<SessionRecord>,
}

impl SimulatedHardware {
    /// Back and front cameras, a microphone, every preset supported
    pub fn new() -> Self {
        let mut cameras = HashMap::new();
        cameras.insert(
            CameraPosition::Back,
            Arc::new(SimulatedCamera::new(CameraPosition::Back)),
        );
        cameras.insert(
            CameraPosition::Front,
            Arc::new(SimulatedCamera::new(CameraPosition::Front)),
        );

        Self {
            cameras: Mutex::new(cameras),
            microphone: Mutex::new(Some(Arc::new(SimulatedMicrophone::new()))),
            supported_presets: vec![
                SessionPreset::Cif352x288,
                SessionPreset::Vga640x480,
                SessionPreset::Iframe960x540,
                SessionPreset::Hd1280x720,
                SessionPreset::Iframe1280x720,
                SessionPreset::Hd1920x1080,
                SessionPreset::Hd4k3840x2160,
            ],
            photo_size: (4, 2),
            photo_delay: Duration::ZERO,
            state: Mutex::new(SessionRecord::default()),
        }
    }

    pub fn with_camera(self, camera: SimulatedCamera) -> Self {
        self.cameras.lock().insert(camera.position, Arc::new(camera));
        self
    }

    pub fn without_camera(self, position: CameraPosition) -> Self {
        self.cameras.lock().remove(&position);
        self
    }

    pub fn without_microphone(self) -> Self {
        *self.microphone.lock() = None;
        self
    }

    pub fn with_supported_presets(mut self, presets: Vec<SessionPreset>) -> Self {
        self.supported_presets = presets;
        self
    }

    pub fn with_photo_size(mut self, width: u32, height: u32) -> Self {
        self.photo_size = (width, height);
        self
    }

    pub fn with_photo_delay(mut self, delay: Duration) -> Self {
        self.photo_delay = delay;
        self
    }

    pub fn camera(&self, position: CameraPosition) -> Option<Arc<SimulatedCamera>> {
        self.cameras.lock().get(&position).cloned()
    }

    pub fn remove_camera(&self, position: CameraPosition) {
        self.cameras.lock().remove(&position);
    }

    pub fn fail_next_photo(&self, error: HardwareError) {
        self.state.lock().photo_failure = Some(error);
    }

    /// Make the active (or next) recording fail when it is finalized
    pub fn fail_recording(&self, error: HardwareError) {
        self.state.lock().recording_failure = Some(error);
    }

    pub fn record(&self) -> SessionRecord {
        self.state.lock().clone()
    }

    fn change(&self, apply: impl FnOnce(&mut SessionRecord)) {
        let mut state = self.state.lock();
        if state.configuration_depth == 0 {
            state.unbracketed_changes += 1;
        }
        apply(&mut state);
    }

    fn render_photo(&self) -> Result<Vec<u8>, HardwareError> {
        let (width, height) = self.photo_size;
        let buffer = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 40 % 256) as u8, (y * 40 % 256) as u8, 128u8])
        });

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .map_err(|e| HardwareError::operation("capture_photo", e.to_string()))?;
        Ok(bytes)
    }
}

impl Default for SimulatedHardware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureHardware for SimulatedHardware {
    fn discover_camera(&self, position: CameraPosition) -> Option<Arc<dyn VideoDevice>> {
        self.camera(position)
            .map(|camera| camera as Arc<dyn VideoDevice>)
    }

    fn discover_microphone(&self) -> Option<Arc<dyn AudioDevice>> {
        self.microphone
            .lock()
            .clone()
            .map(|microphone| microphone as Arc<dyn AudioDevice>)
    }

    fn begin_configuration(&self) {
        self.state.lock().configuration_depth += 1;
    }

    fn commit_configuration(&self) {
        let mut state = self.state.lock();
        state.configuration_depth = state.configuration_depth.saturating_sub(1);
        state.configurations_committed += 1;
    }

    fn can_set_preset(&self, preset: SessionPreset) -> bool {
        self.supported_presets.contains(&preset)
    }

    fn set_preset(&self, preset: SessionPreset) {
        self.change(|state| state.preset = Some(preset));
    }

    fn add_input(&self, input: &DeviceInput) -> Result<(), HardwareError> {
        let mut result = Ok(());
        self.change(|state| {
            if state.inputs.iter().any(|existing| existing.kind == input.kind) {
                result = Err(HardwareError::operation(
                    "add_input",
                    format!("a {} input is already attached", input.kind),
                ));
            } else {
                state.inputs.push(input.clone());
            }
        });
        result
    }

    fn remove_input(&self, input: &DeviceInput) {
        self.change(|state| state.inputs.retain(|existing| existing != input));
    }

    fn has_output(&self, output: OutputKind) -> bool {
        self.state.lock().outputs.contains(&output)
    }

    fn add_output(&self, output: OutputKind) -> Result<(), HardwareError> {
        let mut result = Ok(());
        self.change(|state| {
            if state.outputs.contains(&output) {
                result = Err(HardwareError::operation(
                    "add_output",
                    format!("{:?} output is already attached", output),
                ));
            } else {
                state.outputs.push(output);
            }
        });
        result
    }

    fn configure_connection(&self, output: OutputKind, settings: ConnectionSettings) {
        self.change(|state| {
            state.connections.insert(output, settings);
        });
    }

    fn supports_still_stabilization(&self) -> bool {
        true
    }

    fn start_running(&self) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        if state.inputs.is_empty() {
            return Err(HardwareError::operation(
                "start_running",
                "no inputs attached",
            ));
        }
        state.running = true;
        state.start_running_calls += 1;
        debug!("Simulated session running");
        Ok(())
    }

    fn stop_running(&self) {
        let mut state = self.state.lock();
        state.running = false;
        state.stop_running_calls += 1;
        debug!("Simulated session stopped");
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    async fn capture_photo(&self, settings: PhotoSettings) -> Result<Vec<u8>, HardwareError> {
        {
            let mut state = self.state.lock();
            if !state.running {
                return Err(HardwareError::SessionNotRunning);
            }
            state.last_photo_settings = Some(settings);
            if let Some(error) = state.photo_failure.take() {
                return Err(error);
            }
        }

        if !self.photo_delay.is_zero() {
            tokio::time::sleep(self.photo_delay).await;
        }

        if !self.is_running() {
            return Err(HardwareError::SessionNotRunning);
        }

        let bytes = self.render_photo()?;
        self.state.lock().photos_captured += 1;
        trace!("Simulated photo captured ({} bytes)", bytes.len());
        Ok(bytes)
    }

    async fn start_recording(&self, request: RecordingRequest) -> Result<(), HardwareError> {
        {
            let state = self.state.lock();
            if !state.running {
                return Err(HardwareError::SessionNotRunning);
            }
            if state.recording.is_some() {
                return Err(HardwareError::operation(
                    "start_recording",
                    "a recording is already in progress",
                ));
            }
        }

        tokio::fs::write(&request.path, b"")
            .await
            .map_err(|e| HardwareError::operation("start_recording", e.to_string()))?;

        let mut state = self.state.lock();
        state.recording = Some(request);
        state.recordings_started += 1;
        Ok(())
    }

    async fn stop_recording(&self) -> Result<PathBuf, HardwareError> {
        let (request, failure) = {
            let mut state = self.state.lock();
            let request = state.recording.take().ok_or_else(|| {
                HardwareError::operation("stop_recording", "no recording in progress")
            })?;
            (request, state.recording_failure.take())
        };

        if let Some(error) = failure {
            let _ = tokio::fs::remove_file(&request.path).await;
            return Err(error);
        }

        tokio::fs::write(&request.path, SIMULATED_MOVIE_BYTES)
            .await
            .map_err(|e| HardwareError::operation("stop_recording", e.to_string()))?;

        debug!("Simulated recording finalized: {}", request.path.display());
        Ok(request.path)
    }

    fn is_recording(&self) -> bool {
        self.state.lock().recording.is_some()
    }
}

/// Motion sensor whose gravity reading is set by hand
pub struct SimulatedMotion {
    available: bool,
    gravity: Mutex<Option<Gravity>>,
}

impl SimulatedMotion {
    pub fn new() -> Self {
        Self {
            available: true,
            gravity: Mutex::new(None),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            gravity: Mutex::new(None),
        }
    }

    pub fn set_gravity(&self, gravity: Option<Gravity>) {
        *self.gravity.lock() = gravity;
    }
}

impl Default for SimulatedMotion {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSensor for SimulatedMotion {
    fn is_available(&self) -> bool {
        self.available
    }

    fn gravity(&self) -> Option<Gravity> {
        *self.gravity.lock()
    }
}

fn format(
    width: u32,
    height: u32,
    max_rate: f64,
    stabilization_modes: Vec<StabilizationMode>,
    max_zoom_factor: f64,
) -> DeviceFormat {
    DeviceFormat {
        width,
        height,
        frame_rate_ranges: vec![FrameRateRange::new(2.0, max_rate)],
        stabilization_modes,
        max_zoom_factor,
    }
}

fn default_back_formats() -> Vec<DeviceFormat> {
    use StabilizationMode::*;
    vec![
        format(1280, 720, 60.0, vec![Standard], 16.0),
        format(1920, 1080, 30.0, vec![Standard], 16.0),
        format(1920, 1080, 60.0, vec![Standard, Cinematic], 16.0),
        format(3840, 2160, 30.0, vec![Standard, Cinematic], 8.0),
        format(
            3840,
            2160,
            60.0,
            vec![Standard, Cinematic, CinematicExtended, Auto],
            8.0,
        ),
    ]
}

fn default_front_formats() -> Vec<DeviceFormat> {
    use StabilizationMode::*;
    vec![
        format(1280, 720, 60.0, vec![Standard], 4.0),
        format(1920, 1080, 30.0, vec![Standard], 4.0),
        format(1920, 1080, 60.0, vec![Standard], 4.0),
    ]
}
