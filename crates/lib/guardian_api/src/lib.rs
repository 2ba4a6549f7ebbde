//! # guardian_api
//!
//! HTTP API library for CityGuardian.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};
use guardian_core::media::{MediaIntake, MediaLimits};
use guardian_core::store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, complaints, health, upload, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User and complaint persistence.
    pub store: Arc<dyn Store>,
    /// Validating image upload front door.
    pub media: Arc<MediaIntake>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, media: MediaIntake, config: ApiConfig) -> Self {
        Self {
            store,
            media: Arc::new(media),
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `guardian_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    guardian_core::migrate::migrate(pool).await
}

/// Request body cap for upload routes: a full batch of maximum-size files,
/// with room for base64 expansion and multipart framing.
///
/// Multipart and base64 batches are far larger than axum's 2 MiB default.
/// Oversize files must reach validation to be reported as 400, not 413.
fn upload_body_limit(limits: &MediaLimits) -> usize {
    let batch = limits.max_files.saturating_mul(limits.max_file_bytes);
    (batch / 3)
        .saturating_mul(4)
        .saturating_add(4)
        .saturating_add(1024 * 1024)
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_body_limit = upload_body_limit(state.media.limits());

    // Public routes (session optional)
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(
            routes::COMPLAINTS,
            get(complaints::list_handler).post(complaints::submit_handler),
        )
        .route(routes::GET_COMPLAINT_ID, get(complaints::get_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_auth,
        ));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::GET_AUTH_SESSION, get(auth::session_handler))
        .route(routes::GET_USERS_ME, get(users::me_handler))
        .route(routes::PUT_USERS_ME_AVATAR, put(users::avatar_handler))
        .route(
            routes::UPLOAD,
            post(upload::upload_handler)
                .put(upload::inline_upload_handler)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(routes::GET_COMPLAINTS_MINE, get(complaints::mine_handler))
        .route(
            routes::PATCH_COMPLAINT_STATUS,
            patch(complaints::update_status_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_limit_covers_a_base64_batch() {
        let limits = MediaLimits::default();
        let batch = limits.max_files * limits.max_file_bytes;
        assert!(upload_body_limit(&limits) >= batch * 4 / 3 + 1024 * 1024);
    }

    #[test]
    fn huge_configured_limits_saturate_instead_of_overflowing() {
        let limits = MediaLimits {
            max_file_bytes: usize::MAX / 2,
            max_files: 8,
        };
        assert_eq!(upload_body_limit(&limits), usize::MAX);
    }
}
