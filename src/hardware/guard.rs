use super::interface::{CaptureHardware, VideoDevice};
use crate::error::HardwareError;
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// Open begin/commit configuration pair on a capture session.
///
/// Commits when dropped, so downstream outputs only ever observe the
/// configuration as a whole.
pub struct ConfigurationBracket {
    hardware: Arc<dyn CaptureHardware>,
}

impl ConfigurationBracket {
    pub fn begin(hardware: Arc<dyn CaptureHardware>) -> Self {
        trace!("Beginning session configuration");
        hardware.begin_configuration();
        Self { hardware }
    }
}

impl Drop for ConfigurationBracket {
    fn drop(&mut self) {
        self.hardware.commit_configuration();
        trace!("Committed session configuration");
    }
}

/// Exclusive configuration access to a camera, released when dropped
pub struct DeviceConfigLock {
    device: Arc<dyn VideoDevice>,
}

impl DeviceConfigLock {
    pub fn acquire(device: &Arc<dyn VideoDevice>) -> Result<Self, HardwareError> {
        device.lock_for_configuration()?;
        trace!("Locked device {} for configuration", device.id());
        Ok(Self {
            device: Arc::clone(device),
        })
    }
}

impl Deref for DeviceConfigLock {
    type Target = dyn VideoDevice;

    fn deref(&self) -> &Self::Target {
        self.device.as_ref()
    }
}

impl Drop for DeviceConfigLock {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
        trace!("Unlocked device {}", self.device.id());
    }
}
