//! Session middleware: token extraction and JWT verification.
//!
//! Tokens arrive as `Authorization: Bearer <jwt>` or in the session cookie;
//! the header wins when both are present.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use guardian_core::auth::jwt::verify_session_token;
use guardian_core::models::auth::SessionClaims;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::SESSION_COOKIE;

/// Key used to store verified `SessionClaims` in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub SessionClaims);

/// Session claims when the request carried a valid token.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<SessionClaims>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|u| u.0.clone()),
        ))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".into()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;
    Ok(Some(token.trim().to_string()))
}

/// The presented token, if any.
fn session_token(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    if let Some(token) = bearer_token(headers)? {
        return Ok(Some(token));
    }
    let jar = CookieJar::from_headers(headers);
    Ok(jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty()))
}

fn verify(state: &AppState, token: &str) -> Result<SessionClaims, AppError> {
    verify_session_token(token, state.config.jwt_secret.as_bytes())
        .map_err(|_| AppError::Unauthorized("Invalid or expired session".into()))
}

/// Axum middleware: rejects the request unless it carries a valid session,
/// then injects `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(request.headers())?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
    let claims = verify(&state, &token)?;
    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}

/// Axum middleware for public routes: injects `AuthenticatedUser` when a
/// valid session is present and passes every request through.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let verified = session_token(request.headers())
        .and_then(|token| token.map(|t| verify(&state, &t)).transpose());
    match verified {
        Ok(Some(claims)) => {
            request.extensions_mut().insert(AuthenticatedUser(claims));
        }
        Ok(None) => {}
        Err(e) => debug!("ignoring unusable session on public route: {e}"),
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::COOKIE;

    #[test]
    fn bearer_header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("guardian_session=from-cookie"));
        assert_eq!(session_token(&headers).unwrap().as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("other=1; guardian_session=abc"));
        assert_eq!(session_token(&headers).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(matches!(session_token(&headers), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn no_token_is_none() {
        assert!(session_token(&HeaderMap::new()).unwrap().is_none());
    }
}
