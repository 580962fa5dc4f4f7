use super::format::{frame_duration, negotiate_format, select_preset};
use super::state::{SessionState, SessionStatus};
use super::zoom::ZoomState;
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::events::CaptureDelegate;
use crate::hardware::{
    CameraPosition, CaptureHardware, ConfigurationBracket, ConnectionSettings, DeviceConfigLock,
    DeviceInput, ExposureMode, FocusMode, FocusPoint, OutputKind, VideoDevice,
};
use crate::orientation::OrientationFusion;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace, warn};

/// Operations executed in order on the session queue
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Start,
    Stop,
    SwitchCamera,
    FocusAt(FocusPoint),
    PrepareForZoom,
    Zoom(f64),
    Flush(oneshot::Sender<()>),
}

/// Camera and microphone currently attached to the session
struct DeviceBinding {
    camera: Arc<dyn VideoDevice>,
    camera_input: DeviceInput,
    microphone_input: DeviceInput,
}

/// Owns the device binding and zoom state; the only writer of session configuration
pub(crate) struct SessionWorker {
    config: CaptureConfig,
    hardware: Arc<dyn CaptureHardware>,
    orientation: Arc<OrientationFusion>,
    delegate: Arc<dyn CaptureDelegate>,
    pending_starts: Arc<AtomicUsize>,
    status: watch::Sender<SessionStatus>,
    binding: Option<DeviceBinding>,
    zoom: ZoomState,
}

impl SessionWorker {
    pub(crate) fn new(
        config: CaptureConfig,
        hardware: Arc<dyn CaptureHardware>,
        orientation: Arc<OrientationFusion>,
        delegate: Arc<dyn CaptureDelegate>,
        pending_starts: Arc<AtomicUsize>,
        status: watch::Sender<SessionStatus>,
    ) -> Self {
        Self {
            config,
            hardware,
            orientation,
            delegate,
            pending_starts,
            status,
            binding: None,
            zoom: ZoomState::new(1.0),
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        debug!("Session worker started");

        while let Some(command) = commands.recv().await {
            trace!("Session command: {:?}", command);
            match command {
                SessionCommand::Start => self.start(),
                SessionCommand::Stop => self.stop(),
                SessionCommand::SwitchCamera => self.switch_camera(),
                SessionCommand::FocusAt(point) => self.focus_at(point),
                SessionCommand::PrepareForZoom => self.prepare_for_zoom(),
                SessionCommand::Zoom(multiplier) => self.zoom(multiplier),
                SessionCommand::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        self.orientation.stop_updates();
        debug!("Session worker stopped");
    }

    fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    fn set_state(&self, state: SessionState) {
        self.status.send_modify(|status| status.state = state);
        debug!("Session state changed to: {:?}", state);
    }

    fn report(&self, error: CaptureError) {
        error!("Session operation failed: {}", error);
        self.delegate.on_error(error);
    }

    fn start(&mut self) {
        let previous = self.state();
        if previous == SessionState::Running && self.hardware.is_running() {
            debug!("Session already running; start ignored");
            return;
        }

        self.set_state(SessionState::Configuring);

        match self.bring_up() {
            Ok(()) => {
                self.set_state(SessionState::Running);
                info!("Capture session running");
            }
            Err(e) => {
                self.set_state(previous);
                self.report(e);
            }
        }
    }

    fn bring_up(&mut self) -> Result<(), CaptureError> {
        if self.binding.is_none() {
            self.configure()?;
        }

        if !self.hardware.is_running() {
            self.hardware.start_running()?;
        }

        self.reset_zoom();
        self.orientation.start_updates();
        Ok(())
    }

    fn discover_camera(&self) -> Result<Arc<dyn VideoDevice>, CaptureError> {
        self.hardware
            .discover_camera(CameraPosition::Back)
            .or_else(|| {
                debug!("No back camera; trying the front camera");
                self.hardware.discover_camera(CameraPosition::Front)
            })
            .ok_or(CaptureError::CameraUnavailable)
    }

    fn configure(&mut self) -> Result<(), CaptureError> {
        let camera = self.discover_camera()?;
        let microphone = self
            .hardware
            .discover_microphone()
            .ok_or(CaptureError::MicrophoneUnavailable)?;

        let _bracket = ConfigurationBracket::begin(Arc::clone(&self.hardware));

        let preset = select_preset(self.hardware.as_ref(), self.config.preset);
        self.hardware.set_preset(preset);

        for output in [OutputKind::Photo, OutputKind::Movie] {
            if !self.hardware.has_output(output) {
                self.hardware.add_output(output)?;
            }
        }

        let camera_input = DeviceInput::camera(camera.as_ref());
        self.hardware.add_input(&camera_input)?;

        let microphone_input = DeviceInput::microphone(microphone.as_ref());
        if let Err(e) = self.hardware.add_input(&microphone_input) {
            self.hardware.remove_input(&camera_input);
            return Err(e.into());
        }

        self.apply_camera_settings(&camera);
        self.configure_connections(camera.position());

        info!(
            "Session configured: {:?} preset, {:?} camera {}, microphone {}",
            preset,
            camera.position(),
            camera.id(),
            microphone.id()
        );

        let position = camera.position();
        self.status.send_modify(|status| {
            status.preset = Some(preset);
            status.camera_position = Some(position);
        });
        self.binding = Some(DeviceBinding {
            camera,
            camera_input,
            microphone_input,
        });
        Ok(())
    }

    fn apply_camera_settings(&self, camera: &Arc<dyn VideoDevice>) {
        let device = match DeviceConfigLock::acquire(camera) {
            Ok(device) => device,
            Err(e) => {
                warn!("Could not lock {} to apply settings: {}", camera.id(), e);
                return;
            }
        };

        device.set_subject_area_monitoring(true);
        if device.focus_capabilities().smooth_auto_focus {
            device.set_smooth_auto_focus(true);
        }

        match negotiate_format(&device.formats(), &self.config) {
            Some(format) => {
                device.set_active_format(&format, frame_duration(self.config.frame_rate));
            }
            None => warn!(
                "No {} format matches {:?} at {} fps; keeping the active format",
                device.id(),
                self.config.preset,
                self.config.frame_rate
            ),
        }
    }

    fn configure_connections(&self, position: CameraPosition) {
        let mirrored = position == CameraPosition::Front;
        self.hardware.configure_connection(
            OutputKind::Movie,
            ConnectionSettings {
                stabilization: Some(self.config.stabilization_mode),
                mirrored,
            },
        );
        self.hardware.configure_connection(
            OutputKind::Photo,
            ConnectionSettings {
                stabilization: None,
                mirrored,
            },
        );
    }

    fn reset_zoom(&mut self) {
        let Some(binding) = &self.binding else {
            return;
        };

        self.zoom = ZoomState::new(binding.camera.max_zoom_factor());
        match DeviceConfigLock::acquire(&binding.camera) {
            Ok(device) => device.set_zoom_factor(self.zoom.current_factor),
            Err(e) => warn!("Could not reset zoom on {}: {}", binding.camera.id(), e),
        }

        let factor = self.zoom.current_factor;
        self.status.send_modify(|status| status.zoom_factor = factor);
    }

    fn stop(&mut self) {
        self.orientation.stop_updates();

        if self.hardware.is_running() {
            self.hardware.stop_running();
            info!("Capture session stopped");
        } else {
            debug!("Session was not running");
        }

        self.set_state(SessionState::Stopped);
    }

    fn switch_camera(&mut self) {
        if self.hardware.is_recording() || self.pending_starts.load(Ordering::SeqCst) > 0 {
            warn!("Camera switch ignored while recording");
            return;
        }

        let Some(binding) = &self.binding else {
            debug!("No camera bound; switch ignored");
            return;
        };

        let target = binding.camera.position().opposite();
        let Some(camera) = self.hardware.discover_camera(target) else {
            warn!("No {:?} camera available; keeping the current one", target);
            self.report(CaptureError::CameraUnavailable);
            return;
        };

        let previous_input = binding.camera_input.clone();
        let previous_state = self.state();
        self.set_state(SessionState::Configuring);

        let result = {
            let _bracket = ConfigurationBracket::begin(Arc::clone(&self.hardware));
            self.hardware.remove_input(&previous_input);

            let input = DeviceInput::camera(camera.as_ref());
            match self.hardware.add_input(&input) {
                Ok(()) => {
                    self.apply_camera_settings(&camera);
                    self.configure_connections(target);
                    Ok(input)
                }
                Err(e) => {
                    if let Err(restore) = self.hardware.add_input(&previous_input) {
                        error!("Failed to restore camera input: {}", restore);
                    }
                    Err(e)
                }
            }
        };

        match result {
            Ok(camera_input) => {
                if let Some(binding) = self.binding.as_mut() {
                    binding.camera = camera;
                    binding.camera_input = camera_input;
                }
                self.status
                    .send_modify(|status| status.camera_position = Some(target));
                self.reset_zoom();
                if let Some(binding) = &self.binding {
                    info!(
                        "Switched to the {:?} camera {} (microphone {} kept)",
                        target, binding.camera_input.device_id, binding.microphone_input.device_id
                    );
                }
            }
            Err(e) => self.report(e.into()),
        }

        self.set_state(previous_state);
    }

    fn focus_at(&self, point: FocusPoint) {
        let Some(binding) = &self.binding else {
            return;
        };

        let point = point.clamped();
        let device = match DeviceConfigLock::acquire(&binding.camera) {
            Ok(device) => device,
            Err(e) => {
                warn!("Focus request dropped: {}", e);
                return;
            }
        };

        let capabilities = device.focus_capabilities();
        if capabilities.continuous_auto_focus {
            device.set_focus_mode(FocusMode::ContinuousAutoFocus);
        }
        if capabilities.focus_point_of_interest {
            device.set_focus_point_of_interest(point);
        }
        if capabilities.exposure_point_of_interest {
            device.set_exposure_point_of_interest(point);
        }
        if capabilities.continuous_auto_exposure {
            device.set_exposure_mode(ExposureMode::ContinuousAutoExposure);
        }

        debug!("Focus and exposure set at ({:.3}, {:.3})", point.x, point.y);
    }

    fn prepare_for_zoom(&mut self) {
        if let Some(binding) = &self.binding {
            self.zoom.begin_gesture(binding.camera.zoom_factor());
            trace!("Zoom gesture base: {}", self.zoom.base_factor);
        }
    }

    fn zoom(&mut self, multiplier: f64) {
        let Some(binding) = &self.binding else {
            return;
        };

        let device = match DeviceConfigLock::acquire(&binding.camera) {
            Ok(device) => device,
            Err(e) => {
                warn!("Zoom request dropped: {}", e);
                return;
            }
        };
        let Some(factor) = self.zoom.apply(multiplier) else {
            debug!("Ignoring zoom multiplier {}", multiplier);
            return;
        };
        device.set_zoom_factor(factor);
        drop(device);

        self.status.send_modify(|status| status.zoom_factor = factor);
        trace!("Zoom factor now {}", factor);
    }
}
