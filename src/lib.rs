pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod hardware;
pub mod logging;
pub mod orientation;
pub mod photo;
pub mod session;

pub use config::{
    CaptureConfig, FlashMode, LoggingConfig, OrientationConfig, PocketcamConfig, SessionPreset,
    StabilizationMode, StorageConfig, VideoFileType,
};
pub use controller::{CameraController, ControlIntent, PermissionProvider, PermissionStatus, StaticPermissions};
pub use error::{CaptureError, HardwareError, MediaKind, PocketcamError, Result};
pub use events::{CaptureDelegate, ChannelDelegate, SessionEvent};
pub use hardware::{CameraPosition, CaptureHardware, FocusPoint, Gravity, MotionSensor, VideoDevice};
pub use logging::init_logging;
pub use orientation::{resolve_orientation, Orientation, OrientationFusion, OrientationSlot, VideoOrientation};
pub use photo::{CapturedPhoto, Rotation};
pub use session::{SessionManager, SessionManagerBuilder, SessionState, SessionStatus, ZoomState};
