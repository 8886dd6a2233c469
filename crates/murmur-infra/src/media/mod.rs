//! Media uploader implementations.

mod inspect;
mod local;
mod memory;

#[cfg(feature = "remote-media")]
mod http;

pub use inspect::{MAX_IMAGE_BYTES, check_image, inspect_image};
pub use local::LocalMediaUploader;
pub use memory::InMemoryMediaUploader;

#[cfg(feature = "remote-media")]
pub use http::{HttpMediaConfig, HttpMediaUploader};

use murmur_core::ports::ImageInfo;

/// Fresh object key for an uploaded post image.
fn object_key(info: &ImageInfo) -> String {
    format!("posts/{}.{}", uuid::Uuid::new_v4(), info.extension)
}
