mod builder;
mod capture;
mod format;
mod manager;
mod recording;
mod state;
mod worker;
mod zoom;


pub use builder::SessionManagerBuilder;
pub use format::{frame_duration, negotiate_format, select_preset};
pub use manager::SessionManager;
pub use recording::RecordingFile;
pub use state::{SessionState, SessionStatus};
pub use zoom::{ZoomState, MIN_ZOOM_FACTOR, ZOOM_SAFETY_CEILING};
