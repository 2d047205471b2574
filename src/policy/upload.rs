//! Image upload to the media host.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::Config;
use crate::policy::api_types::ApiUploadResponse;
use crate::policy::error::UploadError;
use crate::policy::types::ImageBlob;

/// Something that turns a raw image into a hosted URL.
#[async_trait]
pub trait ImageUploader: Send + Sync {
  async fn upload(&self, image: ImageBlob) -> Result<String, UploadError>;
}

/// Uploads to an imgbb-compatible host: multipart field `image`, API key in
/// the `key` query parameter.
#[derive(Clone)]
pub struct HostedImageUploader {
  http: Client,
  endpoint: String,
  api_key: Option<String>,
}

impl HostedImageUploader {
  pub fn new(config: &Config) -> Self {
    Self::with_endpoint(&config.upload.url, Config::get_upload_key())
  }

  pub fn with_endpoint(endpoint: &str, api_key: Option<String>) -> Self {
    Self {
      http: Client::new(),
      endpoint: endpoint.to_string(),
      api_key,
    }
  }
}

#[async_trait]
impl ImageUploader for HostedImageUploader {
  async fn upload(&self, image: ImageBlob) -> Result<String, UploadError> {
    let key = self.api_key.as_deref().ok_or(UploadError::NotConfigured)?;
    debug!(file = %image.file_name, bytes = image.bytes.len(), "uploading image");

    let part = Part::bytes(image.bytes).file_name(image.file_name);
    let form = Form::new().part("image", part);

    let resp = self
      .http
      .post(&self.endpoint)
      .query(&[("key", key)])
      .multipart(form)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      warn!(%status, "image host rejected upload");
      return Err(UploadError::Rejected(status));
    }

    let body: ApiUploadResponse = resp.json().await?;
    body.into_url().ok_or(UploadError::MissingUrl)
  }
}

/// Read an image file from disk into a blob
pub async fn read_image(path: &Path) -> Result<ImageBlob, UploadError> {
  let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
    path: path.display().to_string(),
    source,
  })?;
  let file_name = path
    .file_name()
    .and_then(|s| s.to_str())
    .unwrap_or("image.bin")
    .to_string();
  Ok(ImageBlob::new(file_name, bytes))
}
