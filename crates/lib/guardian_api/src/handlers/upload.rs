//! Image upload handlers.

use axum::Json;
use axum::extract::{Multipart, State};
use guardian_core::media::UploadFile;
use tracing::debug;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{InlineUploadRequest, UploadResponse};

/// Multipart field carrying image files.
const FILES_FIELD: &str = "files";

/// `POST /api/upload` — multipart images, validated as one batch and pushed
/// to the image host.
pub async fn upload_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            debug!(field = ?field.name(), "skipping unexpected multipart field");
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("file-{}", files.len() + 1));
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?.to_vec();
        files.push(UploadFile {
            bytes,
            content_type,
            filename,
        });
    }

    debug!(user_id = %user.0.sub, count = files.len(), "received upload batch");
    let images = state.media.upload(&files).await?;
    Ok(Json(UploadResponse { images }))
}

/// `PUT /api/upload` — base64 or data-URL images kept inline.
pub async fn inline_upload_handler(
    State(state): State<AppState>,
    axum::Extension(_user): axum::Extension<AuthenticatedUser>,
    ValidJson(body): ValidJson<InlineUploadRequest>,
) -> AppResult<Json<UploadResponse>> {
    let images = state.media.upload_inline(&body.images)?;
    Ok(Json(UploadResponse { images }))
}
