use crate::error::CaptureError;
use crate::orientation::Orientation;
use chrono::{DateTime, Local};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clockwise rotation applied to captured stills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    /// Rotate 90 degrees clockwise
    Rotate90,
    /// Rotate 180 degrees
    Rotate180,
    /// Rotate 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl Rotation {
    /// Get rotation angle in degrees
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match self {
            Rotation::Rotate90 => image.rotate90(),
            Rotation::Rotate180 => image.rotate180(),
            Rotation::Rotate270 => image.rotate270(),
        }
    }
}

/// An orientation-corrected still ready for the controller
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub id: Uuid,
    pub image: DynamicImage,
    /// Orientation sampled when the photo was requested
    pub orientation: Orientation,
    pub captured_at: DateTime<Local>,
}

impl CapturedPhoto {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode encoded photo bytes and turn them upright for `orientation`
pub fn orient_photo(data: &[u8], orientation: Orientation) -> Result<DynamicImage, CaptureError> {
    let image = image::load_from_memory(data).map_err(|e| CaptureError::PhotoDecode {
        details: e.to_string(),
    })?;

    Ok(match orientation.photo_rotation() {
        Some(rotation) => rotation.apply(&image),
        None => image,
    })
}
