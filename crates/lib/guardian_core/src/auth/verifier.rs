//! Credential verification: email + password → signed session.

use tracing::debug;

use super::AuthError;
use super::identity;
use super::jwt;
use crate::models::auth::Session;
use crate::store::UserStore;

/// Signing material and lifetime for issued sessions.
#[derive(Clone)]
pub struct SessionKeys {
    pub secret: Vec<u8>,
    pub ttl_secs: i64,
}

impl SessionKeys {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Authenticate with email + password.
///
/// Missing users and wrong passwords fail with different variants; callers
/// facing the network should collapse them into one message.
pub async fn authenticate<S>(
    store: &S,
    email: &str,
    password: &str,
    keys: &SessionKeys,
) -> Result<Session, AuthError>
where
    S: UserStore + ?Sized,
{
    let Some(record) = identity::find_by_email(store, email).await? else {
        debug!("login rejected: unknown email");
        return Err(AuthError::NoSuchUser);
    };

    if !identity::verify_password(&record, password)? {
        debug!(user_id = %record.user.id, "login rejected: wrong password");
        return Err(AuthError::InvalidPassword);
    }

    jwt::generate_session_token(&record.user, &keys.secret, keys.ttl_secs)
}
