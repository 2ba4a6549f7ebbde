//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::{ComplaintStore, Store, StoreError, UserStore};
use crate::models::complaint::{
    Complaint, ComplaintFilter, ComplaintStatus, Contact, Coordinates, Location, NewComplaint,
    Priority,
};
use crate::models::media::MediaHandle;
use crate::models::user::{NewUser, Role, User, UserWithPassword};
use crate::uuid::uuidv7;

const USER_COLUMNS: &str = "id, name, email, mobile, address, city, role, avatar, created_at";

const COMPLAINT_COLUMNS: &str = "id, title, category, description, address, lon, lat, priority, \
     contact_mobile, contact_email, images, status, author_id, created_at, updated_at";

/// Row returned by user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    mobile: String,
    address: String,
    city: String,
    role: Role,
    avatar: Option<Json<MediaHandle>>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            mobile: row.mobile,
            address: row.address,
            city: row.city,
            role: row.role,
            avatar: row.avatar.map(|Json(a)| a),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Row returned by complaint queries.
#[derive(Debug, sqlx::FromRow)]
struct ComplaintRow {
    id: Uuid,
    title: String,
    category: String,
    description: String,
    address: String,
    lon: Option<f64>,
    lat: Option<f64>,
    priority: Priority,
    contact_mobile: String,
    contact_email: Option<String>,
    images: Json<Vec<MediaHandle>>,
    status: ComplaintStatus,
    author_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ComplaintRow> for Complaint {
    fn from(row: ComplaintRow) -> Self {
        let coordinates = match (row.lon, row.lat) {
            (Some(lon), Some(lat)) => Some(Coordinates { lon, lat }),
            _ => None,
        };
        Complaint {
            id: row.id,
            title: row.title,
            category: row.category,
            description: row.description,
            location: Location {
                address: row.address,
                coordinates,
            },
            priority: row.priority,
            contact: Contact {
                mobile: row.contact_mobile,
                email: row.contact_email,
            },
            images: row.images.0,
            status: row.status,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Map constraint violations onto domain variants.
fn map_write_error(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(what.to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::Reference(what.to_string());
        }
    }
    StoreError::DbError(e)
}

/// Store over a shared `PgPool`. Cloning shares the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, mobile, address, city, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.mobile)
            .bind(&user.address)
            .bind(&user.city)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &format!("email {}", user.email)))?;
        Ok(row.into())
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| UserWithPassword {
            user: r.user.into(),
            password_hash: r.password_hash,
        }))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn set_user_avatar(
        &self,
        id: Uuid,
        avatar: Option<MediaHandle>,
    ) -> Result<User, StoreError> {
        let sql = format!("UPDATE users SET avatar = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(avatar.map(Json))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        Ok(row.into())
    }
}

#[async_trait]
impl ComplaintStore for PgStore {
    async fn insert_complaint(&self, complaint: NewComplaint) -> Result<Complaint, StoreError> {
        let sql = format!(
            "INSERT INTO complaints (id, title, category, description, address, lon, lat, \
             priority, contact_mobile, contact_email, images, status, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COMPLAINT_COLUMNS}"
        );
        let coords = complaint.location.coordinates;
        let row = sqlx::query_as::<_, ComplaintRow>(&sql)
            .bind(uuidv7())
            .bind(&complaint.title)
            .bind(&complaint.category)
            .bind(&complaint.description)
            .bind(&complaint.location.address)
            .bind(coords.map(|c| c.lon))
            .bind(coords.map(|c| c.lat))
            .bind(complaint.priority)
            .bind(&complaint.contact.mobile)
            .bind(&complaint.contact.email)
            .bind(Json(&complaint.images))
            .bind(complaint.status)
            .bind(complaint.author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &format!("author {}", complaint.author_id)))?;
        Ok(row.into())
    }

    async fn find_complaint(&self, id: Uuid) -> Result<Option<Complaint>, StoreError> {
        let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1");
        let row = sqlx::query_as::<_, ComplaintRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Complaint::from))
    }

    async fn list_complaints(
        &self,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, StoreError> {
        let sql = format!(
            r#"
            SELECT {COMPLAINT_COLUMNS}
            FROM complaints
            WHERE ($1::uuid IS NULL OR author_id = $1)
              AND ($2::complaint_status IS NULL OR status = $2)
              AND ($3::text IS NULL OR lower(category) = lower($3))
              AND ($4::complaint_priority IS NULL OR priority = $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#
        );
        let rows = sqlx::query_as::<_, ComplaintRow>(&sql)
            .bind(filter.author_id)
            .bind(filter.status)
            .bind(filter.category.as_deref())
            .bind(filter.priority)
            .bind(i64::from(filter.effective_limit()))
            .bind(i64::from(filter.effective_offset()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Complaint::from).collect())
    }

    async fn update_complaint_status(
        &self,
        id: Uuid,
        status: ComplaintStatus,
    ) -> Result<Complaint, StoreError> {
        let sql = format!(
            "UPDATE complaints SET status = $1, updated_at = now() WHERE id = $2 \
             RETURNING {COMPLAINT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ComplaintRow>(&sql)
            .bind(status)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("complaint {id}")))?;
        Ok(row.into())
    }

    async fn complaint_ids_for_author(&self, author_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM complaints WHERE author_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
