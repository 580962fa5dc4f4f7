use crate::error::CaptureError;
use crate::photo::CapturedPhoto;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Outward callback interface of the session manager.
///
/// Supplied once at construction; the manager never holds any other
/// reference to its owner. Callbacks fire on the worker that produced the
/// result, so implementations should hand off quickly.
pub trait CaptureDelegate: Send + Sync {
    /// An operation failed
    fn on_error(&self, error: CaptureError);

    /// A still photo is ready and upright
    fn on_photo_ready(&self, photo: CapturedPhoto);

    /// A clip was finalized at `path`
    fn on_video_ready(&self, path: PathBuf);

    /// A recording is being finalized (`true`) or finalization ended (`false`)
    fn on_processing(&self, _processing: bool) {}
}

/// Results produced by a capture session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Error(CaptureError),
    PhotoReady(CapturedPhoto),
    VideoReady(PathBuf),
    Processing(bool),
}

impl SessionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::Error(error) => format!("Capture error: {}", error),
            SessionEvent::PhotoReady(photo) => format!(
                "Photo {} ready ({}x{}, {:?})",
                photo.id,
                photo.width(),
                photo.height(),
                photo.orientation
            ),
            SessionEvent::VideoReady(path) => format!("Video ready: {}", path.display()),
            SessionEvent::Processing(true) => "Finalizing recording".to_string(),
            SessionEvent::Processing(false) => "Recording finalized".to_string(),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::Error(_) => "error",
            SessionEvent::PhotoReady(_) => "photo_ready",
            SessionEvent::VideoReady(_) => "video_ready",
            SessionEvent::Processing(_) => "processing",
        }
    }
}

/// Delegate that forwards every callback into an mpsc channel
pub struct ChannelDelegate {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelDelegate {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn publish(&self, event: SessionEvent) {
        match &event {
            SessionEvent::Error(error) => error!("Session error: {}", error),
            SessionEvent::PhotoReady(_) | SessionEvent::VideoReady(_) => {
                info!("{}", event.description())
            }
            SessionEvent::Processing(_) => debug!("{}", event.description()),
        }

        if self.sender.send(event).is_err() {
            debug!("Session event receiver dropped; event discarded");
        }
    }
}

impl CaptureDelegate for ChannelDelegate {
    fn on_error(&self, error: CaptureError) {
        self.publish(SessionEvent::Error(error));
    }

    fn on_photo_ready(&self, photo: CapturedPhoto) {
        self.publish(SessionEvent::PhotoReady(photo));
    }

    fn on_video_ready(&self, path: PathBuf) {
        self.publish(SessionEvent::VideoReady(path));
    }

    fn on_processing(&self, processing: bool) {
        self.publish(SessionEvent::Processing(processing));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HardwareError;

    #[tokio::test]
    async fn test_channel_delegate_forwards_in_order() {
        let (delegate, mut events) = ChannelDelegate::new();

        delegate.on_processing(true);
        delegate.on_processing(false);
        delegate.on_video_ready(PathBuf::from("/tmp/clip.mp4"));
        delegate.on_error(CaptureError::Hardware(HardwareError::DeviceLocked));

        let kinds: Vec<&'static str> = [
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
        ]
        .iter()
        .map(SessionEvent::event_type)
        .collect();

        assert_eq!(kinds, vec!["processing", "processing", "video_ready", "error"]);
    }

    #[test]
    fn test_dropped_receiver_is_tolerated() {
        let (delegate, events) = ChannelDelegate::new();
        drop(events);
        delegate.on_video_ready(PathBuf::from("/tmp/clip.mp4"));
    }

    #[test]
    fn test_event_descriptions() {
        assert_eq!(
            SessionEvent::VideoReady(PathBuf::from("/tmp/a.mov")).description(),
            "Video ready: /tmp/a.mov"
        );
        assert_eq!(
            SessionEvent::Error(CaptureError::MicrophoneUnavailable).description(),
            "Capture error: Failed to initialize microphone device"
        );
    }
}
