use crate::config::SessionPreset;
use crate::hardware::CameraPosition;
use serde::{Deserialize, Serialize};

/// Lifecycle of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Configuring,
    Running,
    Stopped,
}

/// Snapshot published by the session worker on every change
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub camera_position: Option<CameraPosition>,
    pub zoom_factor: f64,
    /// Preset actually applied, after any fallback
    pub preset: Option<SessionPreset>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            camera_position: None,
            zoom_factor: 1.0,
            preset: None,
        }
    }
}
