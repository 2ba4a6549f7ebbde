//! Current-user profile handlers.

use axum::Json;
use axum::extract::State;
use guardian_core::auth::identity;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AvatarRequest, ProfileResponse, UserResponse};

/// `GET /api/users/me` — profile plus the ids of the user's complaints, newest first.
pub async fn me_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state
        .store
        .find_user_by_id(user.0.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let complaint_ids = state.store.complaint_ids_for_author(profile.id).await?;
    Ok(Json(ProfileResponse {
        user: profile,
        complaint_ids,
    }))
}

/// `PUT /api/users/me/avatar` — set or clear the avatar handle.
pub async fn avatar_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    ValidJson(body): ValidJson<AvatarRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = identity::set_avatar(state.store.as_ref(), user.0.sub, body.avatar).await?;
    Ok(Json(UserResponse { user }))
}
