//! In-memory uploader - used as fallback when no media backend is configured, and in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use murmur_core::ports::{CheckedImage, MediaError, MediaUploader};

use super::{check_image, object_key};

const BASE_URL: &str = "memory://media";

/// Keeps uploaded objects in a map keyed by URL.
/// Note: Data is lost on process restart.
pub struct InMemoryMediaUploader {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
}

impl InMemoryMediaUploader {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Make every subsequent upload fail, to exercise rollback paths.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub async fn stored(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.objects.read().await.contains_key(url)
    }
}

impl Default for InMemoryMediaUploader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaUploader for InMemoryMediaUploader {
    async fn inspect(&self, bytes: Vec<u8>) -> Result<CheckedImage, MediaError> {
        check_image(bytes).await
    }

    async fn upload(&self, image: CheckedImage) -> Result<String, MediaError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Upload("object store unavailable".to_string()));
        }
        let url = format!("{BASE_URL}/{}", object_key(&image.info));
        self.objects.write().await.insert(url.clone(), image.bytes);
        Ok(url)
    }

    async fn discard(&self, url: &str) -> Result<(), MediaError> {
        self.objects.write().await.remove(url);
        Ok(())
    }
}
