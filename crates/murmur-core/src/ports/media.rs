//! Media uploader port - image validation and remote storage.

use async_trait::async_trait;

/// What a successful decode check learned about an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Image bytes that passed the decode check.
#[derive(Debug, Clone)]
pub struct CheckedImage {
    pub bytes: Vec<u8>,
    pub info: ImageInfo,
}

/// Accepts image bytes, checks they decode, and stores them durably.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Decode check; fails with [`MediaError::InvalidImage`] for anything that is not a raster image.
    async fn inspect(&self, bytes: Vec<u8>) -> Result<CheckedImage, MediaError>;

    /// Store a checked image and return its public URL.
    async fn upload(&self, image: CheckedImage) -> Result<String, MediaError>;

    /// Best-effort removal of a previously uploaded object.
    async fn discard(&self, url: &str) -> Result<(), MediaError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Upload failed: {0}")]
    Upload(String),
}
