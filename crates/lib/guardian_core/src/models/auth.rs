//! Session domain models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject — user ID (standard JWT `sub` claim).
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    /// Role at sign-in. A role change only shows up after re-authentication.
    pub role: Role,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// Issued session: the signed token plus the claims it carries.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: SessionClaims,
    /// Lifetime in seconds from issue.
    pub expires_in: i64,
}
