use crate::config::VideoFileType;
use crate::error::CaptureError;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Destination reserved for a new clip.
///
/// The file is removed when the guard drops unless [`RecordingFile::keep`]
/// was called, so a recording that never starts leaves nothing behind.
#[derive(Debug)]
pub struct RecordingFile {
    path: PathBuf,
    keep: bool,
}

impl RecordingFile {
    /// Create the video directory if needed and pick a fresh timestamped path
    pub async fn reserve(
        directory: &Path,
        file_type: VideoFileType,
        timestamp: DateTime<Local>,
    ) -> Result<Self, CaptureError> {
        fs::create_dir_all(directory)
            .await
            .map_err(|e| CaptureError::Storage {
                path: directory.display().to_string(),
                details: format!("Failed to create video directory: {}", e),
            })?;

        let stem = timestamp.format("%Y-%m-%d_%H-%M-%S%.3f").to_string();
        let mut path = directory.join(format!("{}{}", stem, file_type.suffix()));
        let mut attempt = 1;
        while fs::try_exists(&path).await.unwrap_or(false) {
            path = directory.join(format!("{}_{}{}", stem, attempt, file_type.suffix()));
            attempt += 1;
        }

        debug!("Reserved recording file {}", path.display());
        Ok(Self { path, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hand the file over to the recording; it is no longer removed on drop
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for RecordingFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed unused recording file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove unused recording file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 2, 26, 9, 30, 15)
            .unwrap()
    }

    #[tokio::test]
    async fn test_reserve_creates_directory_and_names_file() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().join("Pocketcam").join("Video");

        let file = RecordingFile::reserve(&directory, VideoFileType::Mov, timestamp())
            .await
            .unwrap();

        assert!(directory.is_dir());
        assert_eq!(
            file.path().file_name().unwrap().to_str().unwrap(),
            "2024-02-26_09-30-15.000.mov"
        );
    }

    #[tokio::test]
    async fn test_existing_name_gets_a_counter() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("2024-02-26_09-30-15.000.mp4"), b"taken").unwrap();

        let file = RecordingFile::reserve(temp.path(), VideoFileType::Mp4, timestamp())
            .await
            .unwrap();
        assert_eq!(
            file.path().file_name().unwrap().to_str().unwrap(),
            "2024-02-26_09-30-15.000_1.mp4"
        );
    }

    #[tokio::test]
    async fn test_unkept_file_is_removed_on_drop() {
        let temp = tempfile::tempdir().unwrap();
        let file = RecordingFile::reserve(temp.path(), VideoFileType::Mp4, timestamp())
            .await
            .unwrap();
        let path = file.path().to_path_buf();
        std::fs::write(&path, b"partial").unwrap();

        drop(file);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_kept_file_survives() {
        let temp = tempfile::tempdir().unwrap();
        let file = RecordingFile::reserve(temp.path(), VideoFileType::M4v, timestamp())
            .await
            .unwrap();
        std::fs::write(file.path(), b"clip").unwrap();

        let path = file.keep();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_directory_reports_storage_error() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        match RecordingFile::reserve(&blocker.join("Video"), VideoFileType::Mp4, timestamp()).await {
            Err(CaptureError::Storage { .. }) => {}
            other => panic!("Expected storage error, got {:?}", other),
        }
    }
}
