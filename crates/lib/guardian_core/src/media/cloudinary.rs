//! Cloudinary image host (signed uploads).

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use super::{ImageHost, MediaError, UploadFile, canonical_content_type};
use crate::models::media::MediaHandle;

/// Default Cloudinary API base.
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1/";

/// Longest edge after the incoming resize.
pub const DEFAULT_MAX_DIMENSION: u32 = 1600;

/// Storage format every upload is converted to.
pub const NORMALIZED_FORMAT: &str = "webp";

/// Cloudinary account settings.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Folder new assets are filed under.
    pub folder: String,
    pub api_base: Url,
    pub max_dimension: u32,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

/// Successful upload response (subset).
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    width: Option<u32>,
    height: Option<u32>,
    format: Option<String>,
    bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Build the string Cloudinary signs: `k=v` pairs sorted by key, joined with `&`.
fn string_to_sign(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// SHA-256 request signature (`signature_algorithm=sha256`).
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl From<UploadResponse> for MediaHandle {
    fn from(r: UploadResponse) -> Self {
        MediaHandle {
            url: r.secure_url,
            media_id: r.public_id,
            width: r.width,
            height: r.height,
            format: r.format,
            byte_size: r.bytes,
        }
    }
}

/// Image host backed by the Cloudinary upload API.
pub struct CloudinaryHost {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, action: &str) -> Result<Url, MediaError> {
        self.config
            .api_base
            .join(&format!("{}/image/{action}", self.config.cloud_name))
            .map_err(|e| MediaError::Upstream(format!("cloudinary url: {e}")))
    }

    /// Incoming transformation: bound the longest edge, keep aspect ratio.
    fn transformation(&self) -> String {
        let d = self.config.max_dimension;
        format!("c_limit,w_{d},h_{d},q_auto:good")
    }

    /// Signed upload parameters. Stored assets are normalized to WebP.
    fn upload_params(&self, timestamp: i64) -> [(&'static str, String); 4] {
        [
            ("folder", self.config.folder.clone()),
            ("format", NORMALIZED_FORMAT.to_string()),
            ("timestamp", timestamp.to_string()),
            ("transformation", self.transformation()),
        ]
    }

    async fn read_error(resp: reqwest::Response) -> MediaError {
        let status = resp.status();
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "unreadable error body".to_string(),
        };
        MediaError::Upstream(format!("cloudinary {status}: {message}"))
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, file: &UploadFile) -> Result<MediaHandle, MediaError> {
        let content_type = canonical_content_type(&file.content_type).ok_or_else(|| {
            MediaError::InvalidType {
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
            }
        })?;

        let signed = self.upload_params(Utc::now().timestamp());
        let signature = sign(&signed, &self.config.api_secret);

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(content_type)
            .map_err(|e| MediaError::Upstream(format!("multipart: {e}")))?;
        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (k, v) in signed {
            form = form.text(k, v);
        }

        let resp = self
            .http
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Upstream(format!("cloudinary unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(Self::read_error(resp).await);
        }

        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|e| MediaError::Upstream(format!("cloudinary response: {e}")))?;
        debug!(public_id = %body.public_id, "cloudinary upload complete");
        Ok(body.into())
    }

    async fn delete(&self, media_id: &str) -> Result<(), MediaError> {
        let signed = [
            ("public_id", media_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let signature = sign(&signed, &self.config.api_secret);
        let mut form: Vec<(&str, String)> = signed.to_vec();
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let resp = self
            .http
            .post(self.endpoint("destroy")?)
            .form(&form)
            .send()
            .await
            .map_err(|e| MediaError::Upstream(format!("cloudinary unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(Self::read_error(resp).await);
        }
        Ok(())
    }
}
