mod guard;
mod interface;
pub mod simulated;
#[cfg(test)]
mod tests;

pub use guard::{ConfigurationBracket, DeviceConfigLock};
pub use interface::{
    AudioDevice, CameraPosition, CaptureHardware, ConnectionSettings, DeviceFormat, DeviceInput,
    ExposureMode, FocusCapabilities, FocusMode, FocusPoint, FrameRateRange, Gravity,
    MotionSensor, OutputKind, PhotoSettings, RecordingRequest, VideoDevice,
};
pub use simulated::{SimulatedCamera, SimulatedHardware, SimulatedMicrophone, SimulatedMotion};
