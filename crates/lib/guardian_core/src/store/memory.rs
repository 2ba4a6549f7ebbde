//! In-process store backed by `tokio::sync::RwLock` maps.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ComplaintStore, Store, StoreError, UserStore};
use crate::models::complaint::{Complaint, ComplaintFilter, ComplaintStatus, NewComplaint};
use crate::models::media::MediaHandle;
use crate::models::user::{NewUser, User, UserWithPassword};
use crate::uuid::uuidv7;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserWithPassword>,
    /// Normalized email → user ID.
    emails: HashMap<String, Uuid>,
    complaints: HashMap<Uuid, Complaint>,
    /// Author → complaint IDs in insertion order.
    by_author: HashMap<Uuid, Vec<Uuid>>,
}

/// Volatile store. Everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored complaints.
    pub async fn complaint_count(&self) -> usize {
        self.inner.read().await.complaints.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.emails.contains_key(&user.email) {
            return Err(StoreError::Conflict(format!("email {}", user.email)));
        }
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            mobile: user.mobile,
            address: user.address,
            city: user.city,
            role: user.role,
            avatar: None,
            created_at: Utc::now(),
        };
        inner.emails.insert(record.email.clone(), record.id);
        inner.users.insert(
            record.id,
            UserWithPassword {
                user: record.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(record)
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|u| u.user.clone()))
    }

    async fn set_user_avatar(
        &self,
        id: Uuid,
        avatar: Option<MediaHandle>,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        record.user.avatar = avatar;
        Ok(record.user.clone())
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn insert_complaint(&self, complaint: NewComplaint) -> Result<Complaint, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&complaint.author_id) {
            return Err(StoreError::Reference(format!(
                "author {}",
                complaint.author_id
            )));
        }
        let now = Utc::now();
        let record = Complaint {
            id: uuidv7(),
            title: complaint.title,
            category: complaint.category,
            description: complaint.description,
            location: complaint.location,
            priority: complaint.priority,
            contact: complaint.contact,
            images: complaint.images,
            status: complaint.status,
            author_id: complaint.author_id,
            created_at: now,
            updated_at: now,
        };
        inner
            .by_author
            .entry(record.author_id)
            .or_default()
            .push(record.id);
        inner.complaints.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_complaint(&self, id: Uuid) -> Result<Option<Complaint>, StoreError> {
        Ok(self.inner.read().await.complaints.get(&id).cloned())
    }

    async fn list_complaints(
        &self,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<&Complaint> = inner
            .complaints
            .values()
            .filter(|c| filter.matches(c))
            .collect();
        // UUIDv7 ids sort by creation time, which breaks created_at ties.
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .cloned()
            .collect())
    }

    async fn update_complaint_status(
        &self,
        id: Uuid,
        status: ComplaintStatus,
    ) -> Result<Complaint, StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .complaints
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("complaint {id}")))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn complaint_ids_for_author(&self, author_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.read().await;
        let mut ids = inner.by_author.get(&author_id).cloned().unwrap_or_default();
        ids.reverse();
        Ok(ids)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
