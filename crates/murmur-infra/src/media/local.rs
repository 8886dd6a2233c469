//! Local filesystem uploader - serves images from a directory behind a public base URL.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use murmur_core::ports::{CheckedImage, MediaError, MediaUploader};

use super::{check_image, object_key};

#[derive(Debug, Clone)]
pub struct LocalMediaUploader {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaUploader {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(&self.public_base_url)?
            .strip_prefix('/')
            .filter(|key| !key.contains(".."))
    }
}

#[async_trait]
impl MediaUploader for LocalMediaUploader {
    async fn inspect(&self, bytes: Vec<u8>) -> Result<CheckedImage, MediaError> {
        check_image(bytes).await
    }

    async fn upload(&self, image: CheckedImage) -> Result<String, MediaError> {
        let key = object_key(&image.info);
        let path = self.root.join(&key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::Upload(e.to_string()))?;
        }
        fs::write(&path, image.bytes)
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        tracing::debug!(%key, "Stored image on local disk");
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn discard(&self, url: &str) -> Result<(), MediaError> {
        let Some(key) = self.key_for_url(url) else {
            return Err(MediaError::Upload(format!("not a local media url: {url}")));
        };
        fs::remove_file(self.root.join(key))
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))
    }
}
