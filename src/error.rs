use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Media kinds that require a user permission before capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Camera,
    Microphone,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Camera => write!(f, "camera"),
            MediaKind::Microphone => write!(f, "microphone"),
        }
    }
}

/// Failures reported by the platform capture stack
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    #[error("Capture session is not running")]
    SessionNotRunning,

    #[error("Device is locked for configuration by another client")]
    DeviceLocked,

    #[error("Unsupported: {feature}")]
    Unsupported { feature: String },

    #[error("Hardware operation '{operation}' failed: {details}")]
    Operation { operation: String, details: String },
}

impl HardwareError {
    pub fn operation(operation: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            details: details.into(),
        }
    }
}

/// Errors delivered to the controller through the capture delegate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Failed to initialize camera device")]
    CameraUnavailable,

    #[error("Failed to initialize microphone device")]
    MicrophoneUnavailable,

    #[error("Permission denied for {0}")]
    PermissionDenied(MediaKind),

    #[error("No recording is in progress")]
    NoActiveRecording,

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Failed to decode photo: {details}")]
    PhotoDecode { details: String },

    #[error("Storage error at {path}: {details}")]
    Storage { path: String, details: String },
}

impl CaptureError {
    /// Device-unavailable and permission errors end the session; the rest are per-operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::CameraUnavailable
                | CaptureError::MicrophoneUnavailable
                | CaptureError::PermissionDenied(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum PocketcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl PocketcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PocketcamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(CaptureError::CameraUnavailable.is_fatal());
        assert!(CaptureError::PermissionDenied(MediaKind::Microphone).is_fatal());
        assert!(!CaptureError::NoActiveRecording.is_fatal());
        assert!(!CaptureError::Hardware(HardwareError::DeviceLocked).is_fatal());
    }

    #[test]
    fn test_hardware_error_wraps_into_capture_error() {
        let err: CaptureError = HardwareError::operation("stop_recording", "disk full").into();
        assert_eq!(
            err.to_string(),
            "Hardware error: Hardware operation 'stop_recording' failed: disk full"
        );
    }
}
