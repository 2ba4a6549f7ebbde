//! Complaint submission, listing and status handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use guardian_core::complaints::{self, ComplaintDraft, ComplaintError};
use guardian_core::models::complaint::ComplaintFilter;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::middleware::auth::{AuthenticatedUser, MaybeUser};
use crate::models::{
    ComplaintListResponse, ComplaintResponse, ListQuery, PageQuery, StatusUpdateRequest,
};

/// `POST /api/complaints` — submit as the session's user.
///
/// Mounted on the public router so it can share its path with the listing.
/// The session is checked before the body so anonymous callers always get 401.
pub async fn submit_handler(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    draft: Result<ValidJson<ComplaintDraft>, AppError>,
) -> AppResult<(StatusCode, Json<ComplaintResponse>)> {
    let Some(session) = session else {
        return Err(ComplaintError::Unauthenticated.into());
    };
    let ValidJson(draft) = draft?;
    let complaint = complaints::submit(
        state.store.as_ref(),
        Some(&session),
        draft,
        state.media.limits().max_files,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ComplaintResponse { complaint })))
}

/// `GET /api/complaints` — newest first, optionally filtered.
pub async fn list_handler(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> AppResult<Json<ComplaintListResponse>> {
    let filter = ComplaintFilter::from(query);
    let items = complaints::list(state.store.as_ref(), &filter).await?;
    Ok(Json(ComplaintListResponse {
        items,
        limit: filter.effective_limit(),
        offset: filter.effective_offset(),
    }))
}

/// `GET /api/complaints/mine`
pub async fn mine_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> AppResult<Json<ComplaintListResponse>> {
    let filter = ComplaintFilter {
        limit: page.limit,
        offset: page.offset,
        ..Default::default()
    };
    let items =
        complaints::authored_by(state.store.as_ref(), &user.0, page.limit, page.offset).await?;
    Ok(Json(ComplaintListResponse {
        items,
        limit: filter.effective_limit(),
        offset: filter.effective_offset(),
    }))
}

/// `GET /api/complaints/{id}`
pub async fn get_handler(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
) -> AppResult<Json<ComplaintResponse>> {
    let complaint = complaints::get(state.store.as_ref(), id).await?;
    Ok(Json(ComplaintResponse { complaint }))
}

/// `PATCH /api/complaints/{id}/status` — employees and admins only.
pub async fn update_status_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(body): ValidJson<StatusUpdateRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    let complaint = complaints::update_status(
        state.store.as_ref(),
        &user.0,
        id,
        body.status,
        state.config.transition_policy,
    )
    .await?;
    Ok(Json(ComplaintResponse { complaint }))
}
