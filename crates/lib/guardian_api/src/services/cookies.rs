//! Session cookie helpers.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "guardian_session";

/// Build an httpOnly cookie for the session token.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Build an expired cookie to clear the session.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only_with_max_age() {
        let c = session_cookie("tok", 60, true);
        assert_eq!(c.name(), SESSION_COOKIE);
        assert_eq!(c.value(), "tok");
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.max_age(), Some(Duration::seconds(60)));
    }

    #[test]
    fn clearing_cookie_expires_immediately() {
        let c = clear_session_cookie(false);
        assert!(c.value().is_empty());
        assert_eq!(c.max_age(), Some(Duration::ZERO));
    }
}
