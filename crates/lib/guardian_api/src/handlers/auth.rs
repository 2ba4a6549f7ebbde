//! Registration, login and session handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use guardian_core::auth::{identity, verifier};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, SessionResponse, UserResponse,
};
use crate::services::cookies::{clear_session_cookie, session_cookie};

/// `POST /api/auth/register` — create a new account. Does not sign in.
pub async fn register_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = identity::register(
        state.store.as_ref(),
        &body.into(),
        state.config.bcrypt_cost,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// `POST /api/auth/login` — verify credentials, issue a session token and cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let session = verifier::authenticate(
        state.store.as_ref(),
        &body.email,
        &body.password,
        &state.config.session_keys(),
    )
    .await?;

    // Claims carry everything but the profile; read it back for the response.
    let user = state
        .store
        .find_user_by_id(session.claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    let jar = jar.add(session_cookie(
        &session.token,
        session.expires_in,
        state.config.cookie_secure,
    ));
    Ok((
        jar,
        Json(LoginResponse {
            token: session.token,
            token_type: "Bearer".into(),
            expires_in: session.expires_in,
            user,
        }),
    ))
}

/// `POST /api/auth/logout` — clear the session cookie. Tokens are stateless and
/// stay valid until they expire.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    (
        jar.add(clear_session_cookie(state.config.cookie_secure)),
        Json(LogoutResponse { success: true }),
    )
}

/// `GET /api/auth/session` — decoded claims of the current session.
pub async fn session_handler(
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> Json<SessionResponse> {
    Json(SessionResponse { session: user.0 })
}
