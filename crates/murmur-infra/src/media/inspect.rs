//! Decode check for uploaded images.

use image::ImageFormat;

use murmur_core::ports::{CheckedImage, ImageInfo, MediaError};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Sniff the format and fully decode the bytes; only PNG, JPEG, GIF and WebP pass.
pub fn inspect_image(bytes: &[u8]) -> Result<ImageInfo, MediaError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(MediaError::TooLarge {
            size: bytes.len(),
            max: MAX_IMAGE_BYTES,
        });
    }

    let format =
        image::guess_format(bytes).map_err(|e| MediaError::InvalidImage(e.to_string()))?;
    let (content_type, extension) = match format {
        ImageFormat::Png => ("image/png", "png"),
        ImageFormat::Jpeg => ("image/jpeg", "jpg"),
        ImageFormat::Gif => ("image/gif", "gif"),
        ImageFormat::WebP => ("image/webp", "webp"),
        other => {
            return Err(MediaError::InvalidImage(format!(
                "unsupported format {other:?}"
            )));
        }
    };

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MediaError::InvalidImage(e.to_string()))?;

    Ok(ImageInfo {
        width: decoded.width(),
        height: decoded.height(),
        content_type,
        extension,
    })
}

/// Runs [`inspect_image`] on the blocking thread pool, handing the bytes back on success.
pub async fn check_image(bytes: Vec<u8>) -> Result<CheckedImage, MediaError> {
    tokio::task::spawn_blocking(move || {
        let info = inspect_image(&bytes)?;
        Ok(CheckedImage { bytes, info })
    })
    .await
    .map_err(|e| MediaError::Upload(format!("image check aborted: {e}")))?
}
