use crate::error::MediaKind;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Blocked by policy; the user cannot grant it
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Platform permission prompt
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Ask for access to `kind`, prompting the user if needed
    async fn request(&self, kind: MediaKind) -> PermissionStatus;
}

/// Fixed answers, recording what was asked
pub struct StaticPermissions {
    camera: PermissionStatus,
    microphone: PermissionStatus,
    requested: Mutex<Vec<MediaKind>>,
}

impl StaticPermissions {
    pub fn new(camera: PermissionStatus, microphone: PermissionStatus) -> Self {
        Self {
            camera,
            microphone,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    pub fn requested(&self) -> Vec<MediaKind> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn request(&self, kind: MediaKind) -> PermissionStatus {
        self.requested.lock().push(kind);
        match kind {
            MediaKind::Camera => self.camera,
            MediaKind::Microphone => self.microphone,
        }
    }
}
