//! Persistence seams for users and complaints.
//!
//! Two backends implement the traits: [`postgres::PgStore`] for deployments
//! and [`memory::MemoryStore`] for tests and throwaway local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::complaint::{Complaint, ComplaintFilter, ComplaintStatus, NewComplaint};
use crate::models::media::MediaHandle;
use crate::models::user::{NewUser, User, UserWithPassword};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A referenced record does not exist.
    #[error("Dangling reference: {0}")]
    Reference(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Identity persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Look up by normalized email, including the password hash.
    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserWithPassword>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Replace (or clear) the avatar handle.
    async fn set_user_avatar(
        &self,
        id: Uuid,
        avatar: Option<MediaHandle>,
    ) -> Result<User, StoreError>;
}

/// Complaint persistence.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Insert a complaint. Fails with `Reference` when the author is unknown.
    async fn insert_complaint(&self, complaint: NewComplaint) -> Result<Complaint, StoreError>;

    async fn find_complaint(&self, id: Uuid) -> Result<Option<Complaint>, StoreError>;

    /// Newest first, honoring the filter's limit and offset.
    async fn list_complaints(&self, filter: &ComplaintFilter)
    -> Result<Vec<Complaint>, StoreError>;

    /// Overwrite the status. Last write wins.
    async fn update_complaint_status(
        &self,
        id: Uuid,
        status: ComplaintStatus,
    ) -> Result<Complaint, StoreError>;

    /// IDs of complaints written by `author_id`, newest first.
    async fn complaint_ids_for_author(&self, author_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
}

/// Full backend: both record kinds plus a liveness probe.
#[async_trait]
pub trait Store: UserStore + ComplaintStore {
    async fn ping(&self) -> Result<(), StoreError>;
}
