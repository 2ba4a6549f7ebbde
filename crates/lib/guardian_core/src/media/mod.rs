//! Media intake — validates uploaded images and forwards them to an image host.
//!
//! Batches are all-or-nothing. Every file is checked against the type
//! allow-list and the per-file size cap before any upstream call is made, and
//! when one of the concurrent uploads fails the ones that succeeded are
//! deleted again so the caller never receives a partial set of handles.

pub mod cloudinary;
pub mod inline;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::media::MediaHandle;

/// Default per-file size cap: 10 MiB.
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Default maximum number of images per batch (and per complaint).
pub const DEFAULT_MAX_FILES: usize = 5;

/// Accepted MIME types, canonical form.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Media intake errors.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("File '{filename}' has unsupported type '{content_type}'")]
    InvalidType {
        filename: String,
        content_type: String,
    },

    #[error("File '{filename}' is {size} bytes; the limit is {limit} bytes")]
    TooLarge {
        filename: String,
        size: usize,
        limit: usize,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),
}

/// One file from an upload request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub bytes: Vec<u8>,
    /// MIME type as declared by the client.
    pub content_type: String,
    pub filename: String,
}

impl UploadFile {
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Size and count limits applied to every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaLimits {
    pub max_file_bytes: usize,
    pub max_files: usize,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

/// Remote object storage for images.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store one validated file, returning the host-issued handle.
    async fn upload(&self, file: &UploadFile) -> Result<MediaHandle, MediaError>;

    /// Remove a previously uploaded asset.
    async fn delete(&self, media_id: &str) -> Result<(), MediaError>;
}

/// Stand-in used when no image host credentials are configured.
/// Every upload fails, which steers clients onto the inline fallback.
pub struct UnconfiguredHost;

#[async_trait]
impl ImageHost for UnconfiguredHost {
    async fn upload(&self, _file: &UploadFile) -> Result<MediaHandle, MediaError> {
        Err(MediaError::Upstream("image host is not configured".into()))
    }

    async fn delete(&self, _media_id: &str) -> Result<(), MediaError> {
        Ok(())
    }
}

/// Canonicalize a declared MIME type against the allow-list.
///
/// Parameters are dropped, case is ignored and `image/jpg` is accepted as an
/// alias of `image/jpeg`.
pub fn canonical_content_type(declared: &str) -> Option<&'static str> {
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let essence = if essence == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        essence
    };
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|allowed| **allowed == essence)
        .copied()
}

/// Check count, type and size of every file. The first offending file fails
/// the whole batch.
pub fn validate_batch(files: &[UploadFile], limits: &MediaLimits) -> Result<(), MediaError> {
    if files.is_empty() {
        return Err(MediaError::Validation("No files provided".into()));
    }
    if files.len() > limits.max_files {
        return Err(MediaError::Validation(format!(
            "At most {} files may be uploaded at once",
            limits.max_files
        )));
    }
    for file in files {
        if canonical_content_type(&file.content_type).is_none() {
            return Err(MediaError::InvalidType {
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
            });
        }
        if file.byte_size() > limits.max_file_bytes {
            return Err(MediaError::TooLarge {
                filename: file.filename.clone(),
                size: file.byte_size(),
                limit: limits.max_file_bytes,
            });
        }
    }
    Ok(())
}

/// Validating front door to an [`ImageHost`].
#[derive(Clone)]
pub struct MediaIntake {
    host: Arc<dyn ImageHost>,
    limits: MediaLimits,
}

impl MediaIntake {
    pub fn new(host: Arc<dyn ImageHost>, limits: MediaLimits) -> Self {
        Self { host, limits }
    }

    pub fn limits(&self) -> &MediaLimits {
        &self.limits
    }

    /// Validate then upload a batch concurrently.
    pub async fn upload(&self, files: &[UploadFile]) -> Result<Vec<MediaHandle>, MediaError> {
        validate_batch(files, &self.limits)?;

        let results = join_all(files.iter().map(|f| self.host.upload(f))).await;

        let mut handles = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(err) = first_error {
            self.roll_back(&handles).await;
            return Err(err);
        }

        info!(count = handles.len(), "uploaded image batch");
        Ok(handles)
    }

    /// Fallback path: accept base64 payloads and keep them as opaque handles.
    ///
    /// Applies the same type and size rules as [`MediaIntake::upload`].
    pub fn upload_inline(&self, payloads: &[String]) -> Result<Vec<MediaHandle>, MediaError> {
        if payloads.is_empty() {
            return Err(MediaError::Validation("No images provided".into()));
        }
        if payloads.len() > self.limits.max_files {
            return Err(MediaError::Validation(format!(
                "At most {} images may be uploaded at once",
                self.limits.max_files
            )));
        }
        let handles = payloads
            .iter()
            .enumerate()
            .map(|(i, p)| inline::store_inline(p, &format!("image-{}", i + 1), &self.limits))
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = handles.len(), "stored inline image batch");
        Ok(handles)
    }

    async fn roll_back(&self, uploaded: &[MediaHandle]) {
        for handle in uploaded {
            if let Err(e) = self.host.delete(&handle.media_id).await {
                warn!(media_id = %handle.media_id, "failed to roll back upload: {e}");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Host that records calls and fails uploads whose filename starts with `fail`.
    #[derive(Default)]
    pub struct RecordingHost {
        pub uploaded: Mutex<Vec<String>>,
        pub deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageHost for RecordingHost {
        async fn upload(&self, file: &UploadFile) -> Result<MediaHandle, MediaError> {
            if file.filename.starts_with("fail") {
                return Err(MediaError::Upstream("simulated outage".into()));
            }
            self.uploaded.lock().unwrap().push(file.filename.clone());
            let mut handle = MediaHandle::new(
                format!("https://cdn.test/{}", file.filename),
                format!("test/{}", file.filename),
            );
            handle.byte_size = Some(file.byte_size() as u64);
            Ok(handle)
        }

        async fn delete(&self, media_id: &str) -> Result<(), MediaError> {
            self.deleted.lock().unwrap().push(media_id.to_string());
            Ok(())
        }
    }
}
