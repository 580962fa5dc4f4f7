use super::manager::SessionManager;
use crate::config::PocketcamConfig;
use crate::error::{PocketcamError, Result};
use crate::events::CaptureDelegate;
use crate::hardware::{CaptureHardware, MotionSensor, SimulatedMotion};
use std::sync::Arc;

/// Builder for the session manager
pub struct SessionManagerBuilder {
    config: Option<PocketcamConfig>,
    hardware: Option<Arc<dyn CaptureHardware>>,
    motion: Option<Arc<dyn MotionSensor>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl SessionManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            hardware: None,
            motion: None,
            delegate: None,
        }
    }

    pub fn config(mut self, config: PocketcamConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn hardware(mut self, hardware: Arc<dyn CaptureHardware>) -> Self {
        self.hardware = Some(hardware);
        self
    }

    /// Motion source for orientation; without one the orientation stays up
    pub fn motion(mut self, motion: Arc<dyn MotionSensor>) -> Self {
        self.motion = Some(motion);
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn CaptureDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Spawns the session workers; call from within a tokio runtime
    pub fn build(self) -> Result<SessionManager> {
        let config = self.config.unwrap_or_default();

        let hardware = self
            .hardware
            .ok_or_else(|| PocketcamError::system("Capture hardware must be specified"))?;
        let delegate = self
            .delegate
            .ok_or_else(|| PocketcamError::system("Capture delegate must be specified"))?;
        let motion = self
            .motion
            .unwrap_or_else(|| Arc::new(SimulatedMotion::unavailable()));

        SessionManager::initialize(&config, hardware, motion, delegate)
    }
}

impl Default for SessionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
