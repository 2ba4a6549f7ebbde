//! Authentication and identity.
//!
//! Provides password hashing, registration against the identity store,
//! credential verification and session token management.

pub mod identity;
pub mod jwt;
pub mod password;
pub mod verifier;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No user registered with that email")]
    NoSuchUser,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
