mod intent;
mod permissions;


pub use intent::ControlIntent;
pub use permissions::{PermissionProvider, PermissionStatus, StaticPermissions};

use crate::config::{CaptureConfig, PocketcamConfig};
use crate::error::{CaptureError, MediaKind, Result};
use crate::events::CaptureDelegate;
use crate::hardware::{CaptureHardware, FocusPoint, MotionSensor};
use crate::session::{SessionManager, SessionState};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Owner of the session manager.
///
/// Turns control-surface intents into session operations and enforces the
/// photo/video switches and the maximum clip duration.
pub struct CameraController {
    config: CaptureConfig,
    manager: SessionManager,
    recording: bool,
    /// `None` while recording when the duration limit lies beyond the clock's range
    recording_deadline: Option<Instant>,
}

impl CameraController {
    /// Check permissions, then create and start the session.
    ///
    /// An invalid configuration is returned before anything is requested. A
    /// denied permission is reported to `delegate` and returned; no session
    /// is created in either case. Returns once the session start has been
    /// handled.
    pub async fn launch(
        config: &PocketcamConfig,
        hardware: Arc<dyn CaptureHardware>,
        motion: Arc<dyn MotionSensor>,
        permissions: &dyn PermissionProvider,
        delegate: Arc<dyn CaptureDelegate>,
    ) -> Result<Self> {
        config.validate()?;

        for kind in [MediaKind::Camera, MediaKind::Microphone] {
            let status = permissions.request(kind).await;
            if !status.is_granted() {
                warn!("{} permission {}; capture unavailable", kind, status);
                let error = CaptureError::PermissionDenied(kind);
                delegate.on_error(error.clone());
                return Err(error.into());
            }
            debug!("{} permission granted", kind);
        }

        let manager = SessionManager::initialize(config, hardware, motion, delegate)?;
        manager.start();
        manager.focus_at(FocusPoint::center());
        manager.flush().await;

        info!("Camera controller launched ({:?})", manager.state());
        Ok(Self {
            config: config.capture.clone(),
            manager,
            recording: false,
            recording_deadline: None,
        })
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Whether a clip started by this controller has not been ended yet
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Apply one intent. `Break` means the control surface asked to exit.
    pub fn handle(&mut self, intent: ControlIntent) -> ControlFlow<()> {
        debug!("Control intent: {:?}", intent);

        match intent {
            ControlIntent::Exit => {
                self.end_video();
                self.manager.stop();
                info!("Exit requested");
                return ControlFlow::Break(());
            }
            ControlIntent::SwitchCamera => self.manager.switch_camera(),
            ControlIntent::PrepareForZoom => self.manager.prepare_for_zoom(),
            ControlIntent::FocusAt(point) => self.manager.focus_at(point),
            ControlIntent::ChangeZoom(scale) => self.manager.zoom(scale),
            ControlIntent::TakePhoto => {
                if self.config.allow_photo {
                    self.manager.capture_photo();
                } else {
                    debug!("Photos are disabled; ignoring TakePhoto");
                }
            }
            ControlIntent::BeginVideo => self.begin_video(),
            ControlIntent::EndVideo => self.end_video(),
        }

        ControlFlow::Continue(())
    }

    fn begin_video(&mut self) {
        if !self.config.allow_video {
            debug!("Video is disabled; ignoring BeginVideo");
            return;
        }
        if self.recording {
            debug!("Recording already in progress; ignoring BeginVideo");
            return;
        }
        let state = self.manager.state();
        if state != SessionState::Running {
            warn!("Session is {:?}; ignoring BeginVideo", state);
            return;
        }

        self.manager.start_recording();
        self.recording = true;
        self.recording_deadline = Instant::now().checked_add(self.config.max_video_duration());
        if self.recording_deadline.is_none() {
            warn!("Maximum video duration is out of range; recording has no time limit");
        }
    }

    fn end_video(&mut self) {
        self.recording_deadline = None;
        if std::mem::take(&mut self.recording) {
            self.manager.stop_recording();
        }
    }

    /// Process intents until `Exit` or until the sender is dropped
    pub async fn run(&mut self, mut intents: mpsc::Receiver<ControlIntent>) -> Result<()> {
        info!("Camera controller is running");

        loop {
            let deadline = self.recording_deadline;

            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => {
                        if self.handle(intent).is_break() {
                            break;
                        }
                    }
                    None => {
                        info!("Control surface closed");
                        self.end_video();
                        self.manager.stop();
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    info!(
                        "Maximum video duration of {:?} reached",
                        self.config.max_video_duration()
                    );
                    self.end_video();
                }
            }
        }

        info!("Camera controller stopped");
        Ok(())
    }

    /// Stop the session and wait for its workers
    pub async fn shutdown(self) -> Result<()> {
        self.manager.shutdown().await
    }
}
