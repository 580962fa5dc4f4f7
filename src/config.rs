use crate::error::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PocketcamConfig {
    pub capture: CaptureConfig,
    pub orientation: OrientationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Desired capture behavior. Fixed before the session starts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Allow taking still photos
    #[serde(default = "default_allow_photo")]
    pub allow_photo: bool,

    /// Allow recording video clips
    #[serde(default = "default_allow_video")]
    pub allow_video: bool,

    /// Maximum clip duration in seconds
    #[serde(default = "default_max_video_duration")]
    pub max_video_duration: f64,

    /// Flash mode used for still photos
    #[serde(default)]
    pub flash_mode: FlashMode,

    /// Container format for recorded clips
    #[serde(default)]
    pub file_type: VideoFileType,

    /// Target video frame rate
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    /// Target session preset
    #[serde(default)]
    pub preset: SessionPreset,

    /// Video stabilization mode
    #[serde(default)]
    pub stabilization_mode: StabilizationMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OrientationConfig {
    /// Motion sampling interval in milliseconds
    #[serde(default = "default_orientation_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Subdirectory created under the temporary-file area for recordings
    #[serde(default = "default_temp_subdirectory")]
    pub temp_subdirectory: String,

    /// Override for the temporary-file area (defaults to the OS temp dir)
    pub temp_root: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for the pocketcam target (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: pretty, compact or json
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for a daily rolling log file
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoFileType {
    #[default]
    Mp4,
    Mov,
    M4v,
}

impl VideoFileType {
    pub fn suffix(&self) -> &'static str {
        match self {
            VideoFileType::Mp4 => ".mp4",
            VideoFileType::Mov => ".mov",
            VideoFileType::M4v => ".m4v",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPreset {
    Cif352x288,
    Vga640x480,
    Iframe960x540,
    Hd1280x720,
    Iframe1280x720,
    Hd1920x1080,
    #[default]
    Hd4k3840x2160,
}

impl SessionPreset {
    /// Preset used when the configured one is not supported by the session
    pub const FALLBACK: SessionPreset = SessionPreset::Hd1920x1080;

    /// Pixel dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            SessionPreset::Cif352x288 => (352, 288),
            SessionPreset::Vga640x480 => (640, 480),
            SessionPreset::Iframe960x540 => (960, 540),
            SessionPreset::Hd1280x720 | SessionPreset::Iframe1280x720 => (1280, 720),
            SessionPreset::Hd1920x1080 => (1920, 1080),
            SessionPreset::Hd4k3840x2160 => (3840, 2160),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum StabilizationMode {
    #[default]
    Off,
    Standard,
    Cinematic,
    CinematicExtended,
    Auto,
}

impl CaptureConfig {
    pub fn max_video_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_video_duration).unwrap_or(Duration::ZERO)
    }
}

impl OrientationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl StorageConfig {
    /// Directory that receives recorded clips
    pub fn video_directory(&self) -> PathBuf {
        let root = self
            .temp_root
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        root.join(&self.temp_subdirectory).join("Video")
    }
}

impl PocketcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from_file("pocketcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("capture.allow_photo", default_allow_photo())?
            .set_default("capture.allow_video", default_allow_video())?
            .set_default("capture.max_video_duration", default_max_video_duration())?
            .set_default("capture.flash_mode", "off")?
            .set_default("capture.file_type", "mp4")?
            .set_default("capture.frame_rate", default_frame_rate())?
            .set_default("capture.preset", "hd4k3840x2160")?
            .set_default("capture.stabilization_mode", "off")?
            .set_default(
                "orientation.interval_ms",
                default_orientation_interval_ms() as i64,
            )?
            .set_default("storage.temp_subdirectory", default_temp_subdirectory())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // POCKETCAM_CAPTURE__FRAME_RATE=30 style overrides
            .add_source(
                Environment::with_prefix("POCKETCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: PocketcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.capture.frame_rate.is_finite() && self.capture.frame_rate > 0.0) {
            return Err(ConfigError::Message(
                "Capture frame_rate must be greater than 0".to_string(),
            ));
        }

        if !(self.capture.max_video_duration.is_finite() && self.capture.max_video_duration > 0.0)
        {
            return Err(ConfigError::Message(
                "Capture max_video_duration must be greater than 0".to_string(),
            ));
        }

        if self.orientation.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Orientation interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.storage.temp_subdirectory.trim().is_empty() {
            return Err(ConfigError::Message(
                "Storage temp_subdirectory must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            allow_photo: default_allow_photo(),
            allow_video: default_allow_video(),
            max_video_duration: default_max_video_duration(),
            flash_mode: FlashMode::default(),
            file_type: VideoFileType::default(),
            frame_rate: default_frame_rate(),
            preset: SessionPreset::default(),
            stabilization_mode: StabilizationMode::default(),
        }
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_orientation_interval_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_subdirectory: default_temp_subdirectory(),
            temp_root: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

impl Default for PocketcamConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            orientation: OrientationConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// Default value functions
fn default_allow_photo() -> bool {
    true
}
fn default_allow_video() -> bool {
    true
}
fn default_max_video_duration() -> f64 {
    5.0
}
fn default_frame_rate() -> f64 {
    60.0
}

fn default_orientation_interval_ms() -> u64 {
    500
}

fn default_temp_subdirectory() -> String {
    "Pocketcam".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PocketcamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.preset, SessionPreset::Hd4k3840x2160);
        assert_eq!(config.capture.frame_rate, 60.0);
        assert_eq!(config.capture.max_video_duration, 5.0);
        assert_eq!(config.orientation.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_validation() {
        let mut config = PocketcamConfig::default();
        config.capture.frame_rate = 0.0;
        assert!(config.validate().is_err());

        config.capture.frame_rate = 30.0;
        config.capture.max_video_duration = -1.0;
        assert!(config.validate().is_err());

        config.capture.max_video_duration = 10.0;
        config.orientation.interval_ms = 0;
        assert!(config.validate().is_err());

        config.orientation.interval_ms = 250;
        config.storage.temp_subdirectory = "  ".to_string();
        assert!(config.validate().is_err());

        config.storage.temp_subdirectory = "Clips".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[capture]
frame_rate = 30.0
preset = "hd1280x720"
stabilization_mode = "cinematic"
file_type = "mov"
flash_mode = "auto"

[storage]
temp_subdirectory = "Clips"
"#
        )
        .unwrap();

        let config = PocketcamConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.capture.frame_rate, 30.0);
        assert_eq!(config.capture.preset, SessionPreset::Hd1280x720);
        assert_eq!(config.capture.stabilization_mode, StabilizationMode::Cinematic);
        assert_eq!(config.capture.file_type, VideoFileType::Mov);
        assert_eq!(config.capture.flash_mode, FlashMode::Auto);
        assert!(config.capture.allow_video);
        assert_eq!(config.storage.temp_subdirectory, "Clips");
        assert_eq!(config.orientation.interval_ms, 500);
    }

    #[test]
    fn test_toml_rendering() {
        let rendered = PocketcamConfig::default().to_toml().unwrap();
        assert!(rendered.contains("preset = \"hd4k3840x2160\""));
        assert!(rendered.contains("temp_subdirectory = \"Pocketcam\""));
    }

    #[test]
    fn test_video_directory_layout() {
        let storage = StorageConfig {
            temp_subdirectory: "Pocketcam".to_string(),
            temp_root: Some("/tmp/root".to_string()),
        };
        assert_eq!(
            storage.video_directory(),
            PathBuf::from("/tmp/root/Pocketcam/Video")
        );
    }

    #[test]
    fn test_preset_dimensions() {
        assert_eq!(SessionPreset::FALLBACK.dimensions(), (1920, 1080));
        assert_eq!(SessionPreset::Hd4k3840x2160.dimensions(), (3840, 2160));
        assert_eq!(VideoFileType::M4v.suffix(), ".m4v");
    }
}
