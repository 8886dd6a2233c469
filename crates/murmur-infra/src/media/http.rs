//! Remote object-store uploader speaking plain HTTP `PUT`/`DELETE`.

use async_trait::async_trait;
use reqwest::{Client, header};

use murmur_core::ports::{CheckedImage, MediaError, MediaUploader};

use super::{check_image, object_key};

/// Where objects are written and where they are served from.
#[derive(Debug, Clone)]
pub struct HttpMediaConfig {
    /// Base URL objects are `PUT` to, e.g. a bucket endpoint.
    pub upload_endpoint: String,
    /// Base URL clients fetch objects from, e.g. a CDN.
    pub public_base_url: String,
    pub auth_token: Option<String>,
}

pub struct HttpMediaUploader {
    client: Client,
    config: HttpMediaConfig,
}

impl HttpMediaUploader {
    pub fn new(mut config: HttpMediaConfig) -> Self {
        config.upload_endpoint = config.upload_endpoint.trim_end_matches('/').to_string();
        config.public_base_url = config.public_base_url.trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            config,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl MediaUploader for HttpMediaUploader {
    async fn inspect(&self, bytes: Vec<u8>) -> Result<CheckedImage, MediaError> {
        check_image(bytes).await
    }

    async fn upload(&self, image: CheckedImage) -> Result<String, MediaError> {
        let key = object_key(&image.info);
        let target = format!("{}/{}", self.config.upload_endpoint, key);

        let response = self
            .authorize(self.client.put(&target))
            .header(header::CONTENT_TYPE, image.info.content_type)
            .body(image.bytes)
            .send()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), %key, "Object store rejected upload");
            return Err(MediaError::Upload(format!(
                "object store returned {}",
                response.status()
            )));
        }

        Ok(format!("{}/{}", self.config.public_base_url, key))
    }

    async fn discard(&self, url: &str) -> Result<(), MediaError> {
        let key = url
            .strip_prefix(&self.config.public_base_url)
            .map(|k| k.trim_start_matches('/'))
            .ok_or_else(|| MediaError::Upload(format!("not a managed media url: {url}")))?;

        self.authorize(
            self.client
                .delete(format!("{}/{}", self.config.upload_endpoint, key)),
        )
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map(|_| ())
        .map_err(|e| MediaError::Upload(e.to_string()))
    }
}
