use super::capture::{PhotoCommand, PhotoWorker, RecordCommand, RecordWorker};
use super::state::{SessionState, SessionStatus};
use super::worker::{SessionCommand, SessionWorker};
use crate::config::{CaptureConfig, PocketcamConfig};
use crate::error::{CaptureError, PocketcamError, Result};
use crate::events::CaptureDelegate;
use crate::hardware::{CameraPosition, CaptureHardware, FocusPoint, MotionSensor};
use crate::orientation::{Orientation, OrientationFusion};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Front door to the capture session.
///
/// Every operation returns immediately. Work is queued on one of three
/// serial workers (session configuration, photo capture, video recording)
/// and results come back through the [`CaptureDelegate`]. Must be created
/// inside a tokio runtime.
pub struct SessionManager {
    config: CaptureConfig,
    hardware: Arc<dyn CaptureHardware>,
    orientation: Arc<OrientationFusion>,
    delegate: Arc<dyn CaptureDelegate>,
    /// Recording starts queued but not yet handled by the record worker
    pending_starts: Arc<AtomicUsize>,
    session_tx: mpsc::UnboundedSender<SessionCommand>,
    photo_tx: mpsc::UnboundedSender<PhotoCommand>,
    record_tx: mpsc::UnboundedSender<RecordCommand>,
    status: watch::Receiver<SessionStatus>,
    workers: Vec<(&'static str, JoinHandle<()>)>,
}

impl SessionManager {
    /// Validate the configuration and spawn the workers. No hardware is touched.
    pub fn initialize(
        config: &PocketcamConfig,
        hardware: Arc<dyn CaptureHardware>,
        motion: Arc<dyn MotionSensor>,
        delegate: Arc<dyn CaptureDelegate>,
    ) -> Result<Self> {
        config.validate()?;

        let capture = config.capture.clone();
        let orientation = Arc::new(OrientationFusion::new(motion, config.orientation.interval()));
        let (status_tx, status) = watch::channel(SessionStatus::default());

        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (photo_tx, photo_rx) = mpsc::unbounded_channel();
        let (record_tx, record_rx) = mpsc::unbounded_channel();
        let pending_starts = Arc::new(AtomicUsize::new(0));

        let session_worker = SessionWorker::new(
            capture.clone(),
            Arc::clone(&hardware),
            Arc::clone(&orientation),
            Arc::clone(&delegate),
            Arc::clone(&pending_starts),
            status_tx,
        );
        let photo_worker = PhotoWorker::new(
            Arc::clone(&hardware),
            Arc::clone(&delegate),
            capture.flash_mode,
        );
        let record_worker = RecordWorker::new(
            Arc::clone(&hardware),
            Arc::clone(&delegate),
            config.storage.video_directory(),
            capture.file_type,
            capture.max_video_duration(),
            Arc::clone(&pending_starts),
            status.clone(),
        );

        let workers = vec![
            ("session", tokio::spawn(session_worker.run(session_rx))),
            ("photo", tokio::spawn(photo_worker.run(photo_rx))),
            ("record", tokio::spawn(record_worker.run(record_rx))),
        ];

        info!(
            "Session manager initialized ({:?} preset, {} fps, {:?} stabilization)",
            capture.preset, capture.frame_rate, capture.stabilization_mode
        );

        Ok(Self {
            config: capture,
            hardware,
            orientation,
            delegate,
            pending_starts,
            session_tx,
            photo_tx,
            record_tx,
            status,
            workers,
        })
    }

    fn enqueue(&self, command: SessionCommand) {
        if let Err(e) = self.session_tx.send(command) {
            warn!("Session worker is gone; dropped {:?}", e.0);
        }
    }

    pub fn start(&self) {
        debug!("Queueing session start");
        self.enqueue(SessionCommand::Start);
    }

    pub fn stop(&self) {
        debug!("Queueing session stop");
        self.enqueue(SessionCommand::Stop);
    }

    /// Swap front and back cameras. Ignored while a recording is active or requested.
    pub fn switch_camera(&self) {
        if self.is_recording_requested() {
            warn!("Camera switch ignored while recording");
            return;
        }
        self.enqueue(SessionCommand::SwitchCamera);
    }

    /// Focus and expose at a point in normalized device coordinates
    pub fn focus_at(&self, point: FocusPoint) {
        self.enqueue(SessionCommand::FocusAt(point));
    }

    pub fn prepare_for_zoom(&self) {
        self.enqueue(SessionCommand::PrepareForZoom);
    }

    pub fn zoom(&self, multiplier: f64) {
        self.enqueue(SessionCommand::Zoom(multiplier));
    }

    pub fn capture_photo(&self) {
        let orientation = self.orientation.latest();
        debug!("Queueing photo capture ({:?})", orientation);
        if self
            .photo_tx
            .send(PhotoCommand::Capture { orientation })
            .is_err()
        {
            warn!("Photo worker is gone; capture request dropped");
        }
    }

    pub fn start_recording(&self) {
        let orientation = self.orientation.latest();
        debug!("Queueing recording start ({:?})", orientation);
        self.pending_starts.fetch_add(1, Ordering::SeqCst);
        if self
            .record_tx
            .send(RecordCommand::Start { orientation })
            .is_err()
        {
            self.pending_starts.fetch_sub(1, Ordering::SeqCst);
            warn!("Record worker is gone; start request dropped");
        }
    }

    /// Finalize the active recording. `on_processing(true)` fires before this returns.
    pub fn stop_recording(&self) {
        self.delegate.on_processing(true);
        if self.record_tx.send(RecordCommand::Stop).is_err() {
            warn!("Record worker is gone; stop request dropped");
            self.delegate.on_processing(false);
            self.delegate.on_error(CaptureError::NoActiveRecording);
        }
    }

    /// Wait until every operation queued so far has completed
    pub async fn flush(&self) {
        let (session_done, session_wait) = oneshot::channel();
        let (photo_done, photo_wait) = oneshot::channel();
        let (record_done, record_wait) = oneshot::channel();

        let _ = self.session_tx.send(SessionCommand::Flush(session_done));
        let _ = self.photo_tx.send(PhotoCommand::Flush(photo_done));
        let _ = self.record_tx.send(RecordCommand::Flush(record_done));

        let _ = session_wait.await;
        let _ = photo_wait.await;
        let _ = record_wait.await;
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every state, camera or zoom change
    pub fn subscribe_state(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Latest orientation sample
    pub fn orientation(&self) -> Orientation {
        self.orientation.latest()
    }

    pub fn zoom_factor(&self) -> f64 {
        self.status.borrow().zoom_factor
    }

    pub fn camera_position(&self) -> Option<CameraPosition> {
        self.status.borrow().camera_position
    }

    pub fn is_recording(&self) -> bool {
        self.hardware.is_recording()
    }

    /// Recording, or a recording start is still queued
    pub fn is_recording_requested(&self) -> bool {
        self.hardware.is_recording() || self.pending_starts.load(Ordering::SeqCst) > 0
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Stop the session, drain the queues and wait for the workers to exit
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down session manager");

        self.stop();
        self.flush().await;
        self.orientation.stop_updates();

        let SessionManager {
            session_tx,
            photo_tx,
            record_tx,
            workers,
            ..
        } = self;
        drop(session_tx);
        drop(photo_tx);
        drop(record_tx);

        let mut failed = Vec::new();
        for (name, handle) in workers {
            match timeout(WORKER_SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!("{} worker exited", name),
                Ok(Err(e)) => {
                    error!("{} worker panicked: {}", name, e);
                    failed.push(name);
                }
                Err(_) => {
                    error!("{} worker did not exit within {:?}", name, WORKER_SHUTDOWN_TIMEOUT);
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            info!("Session manager shut down");
            Ok(())
        } else {
            Err(PocketcamError::component(
                "session".to_string(),
                format!("workers did not shut down cleanly: {}", failed.join(", ")),
            ))
        }
    }
}
