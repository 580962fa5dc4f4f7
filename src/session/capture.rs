use super::recording::RecordingFile;
use super::state::{SessionState, SessionStatus};
use crate::config::{FlashMode, VideoFileType};
use crate::error::{CaptureError, HardwareError};
use crate::events::CaptureDelegate;
use crate::hardware::{CaptureHardware, PhotoSettings, RecordingRequest};
use crate::orientation::Orientation;
use crate::photo::{orient_photo, CapturedPhoto};
use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub(crate) enum PhotoCommand {
    /// Orientation is sampled when the photo is requested
    Capture { orientation: Orientation },
    Flush(oneshot::Sender<()>),
}

#[derive(Debug)]
pub(crate) enum RecordCommand {
    Start { orientation: Orientation },
    Stop,
    Flush(oneshot::Sender<()>),
}

/// Serial still-capture queue
pub(crate) struct PhotoWorker {
    hardware: Arc<dyn CaptureHardware>,
    delegate: Arc<dyn CaptureDelegate>,
    flash_mode: FlashMode,
}

impl PhotoWorker {
    pub(crate) fn new(
        hardware: Arc<dyn CaptureHardware>,
        delegate: Arc<dyn CaptureDelegate>,
        flash_mode: FlashMode,
    ) -> Self {
        Self {
            hardware,
            delegate,
            flash_mode,
        }
    }

    pub(crate) async fn run(self, mut commands: mpsc::UnboundedReceiver<PhotoCommand>) {
        debug!("Photo worker started");

        while let Some(command) = commands.recv().await {
            match command {
                PhotoCommand::Capture { orientation } => self.capture(orientation).await,
                PhotoCommand::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        debug!("Photo worker stopped");
    }

    async fn capture(&self, orientation: Orientation) {
        let settings = PhotoSettings {
            flash_mode: self.flash_mode,
            still_stabilization: self.hardware.supports_still_stabilization(),
            high_resolution: true,
        };

        let data = match self.hardware.capture_photo(settings).await {
            Ok(data) => data,
            Err(HardwareError::SessionNotRunning) => {
                debug!("Session not running; photo request dropped");
                return;
            }
            Err(e) => {
                error!("Photo capture failed: {}", e);
                self.delegate.on_error(e.into());
                return;
            }
        };

        let decoded = tokio::task::spawn_blocking(move || orient_photo(&data, orientation))
            .await
            .unwrap_or_else(|e| {
                Err(CaptureError::PhotoDecode {
                    details: format!("Photo processing task failed: {}", e),
                })
            });

        match decoded {
            Ok(image) => {
                let photo = CapturedPhoto {
                    id: Uuid::new_v4(),
                    image,
                    orientation,
                    captured_at: Local::now(),
                };
                info!(
                    "Photo {} captured ({}x{}, {:?})",
                    photo.id,
                    photo.width(),
                    photo.height(),
                    orientation
                );
                self.delegate.on_photo_ready(photo);
            }
            Err(e) => {
                error!("Photo processing failed: {}", e);
                self.delegate.on_error(e);
            }
        }
    }
}

/// Serial movie-recording queue
pub(crate) struct RecordWorker {
    hardware: Arc<dyn CaptureHardware>,
    delegate: Arc<dyn CaptureDelegate>,
    directory: PathBuf,
    file_type: VideoFileType,
    max_duration: Duration,
    pending_starts: Arc<AtomicUsize>,
    status: watch::Receiver<SessionStatus>,
}

impl RecordWorker {
    pub(crate) fn new(
        hardware: Arc<dyn CaptureHardware>,
        delegate: Arc<dyn CaptureDelegate>,
        directory: PathBuf,
        file_type: VideoFileType,
        max_duration: Duration,
        pending_starts: Arc<AtomicUsize>,
        status: watch::Receiver<SessionStatus>,
    ) -> Self {
        Self {
            hardware,
            delegate,
            directory,
            file_type,
            max_duration,
            pending_starts,
            status,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<RecordCommand>) {
        debug!("Record worker started");

        while let Some(command) = commands.recv().await {
            match command {
                RecordCommand::Start { orientation } => {
                    self.start(orientation).await;
                    self.pending_starts.fetch_sub(1, Ordering::SeqCst);
                }
                RecordCommand::Stop => self.stop().await,
                RecordCommand::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        debug!("Record worker stopped");
    }

    async fn start(&mut self, orientation: Orientation) {
        if self.hardware.is_recording() {
            warn!("Recording already in progress; start ignored");
            return;
        }

        // Never start a clip inside a session reconfiguration
        let settled = self
            .status
            .wait_for(|status| status.state != SessionState::Configuring)
            .await
            .is_ok();
        if !settled {
            debug!("Session worker is gone; starting without waiting for configuration");
        }

        let file = match RecordingFile::reserve(&self.directory, self.file_type, Local::now()).await {
            Ok(file) => file,
            Err(e) => {
                error!("Could not prepare recording file: {}", e);
                self.delegate.on_error(e);
                return;
            }
        };

        let request = RecordingRequest {
            path: file.path().to_path_buf(),
            orientation: orientation.video_orientation(),
            max_duration: self.max_duration,
        };

        match self.hardware.start_recording(request).await {
            Ok(()) => {
                let path = file.keep();
                info!(
                    "Recording started: {} ({:?})",
                    path.display(),
                    orientation.video_orientation()
                );
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                self.delegate.on_error(e.into());
            }
        }
    }

    async fn stop(&self) {
        if !self.hardware.is_recording() {
            warn!("Stop requested with no active recording");
            self.delegate.on_processing(false);
            self.delegate.on_error(CaptureError::NoActiveRecording);
            return;
        }

        let result = self.hardware.stop_recording().await;
        self.delegate.on_processing(false);

        match result {
            Ok(path) => {
                info!("Recording finished: {}", path.display());
                self.delegate.on_video_ready(path);
            }
            Err(e) => {
                error!("Recording failed: {}", e);
                self.delegate.on_error(e.into());
            }
        }
    }
}
