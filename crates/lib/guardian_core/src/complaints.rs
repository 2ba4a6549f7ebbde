//! Complaint workflow — submission, retrieval and status triage.

use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::auth::SessionClaims;
use crate::models::complaint::{
    Complaint, ComplaintFilter, ComplaintStatus, Contact, Coordinates, Location, NewComplaint,
    Priority,
};
use crate::models::media::MediaHandle;
use crate::store::{ComplaintStore, Store, StoreError};

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Workflow errors.
#[derive(Debug, Error)]
pub enum ComplaintError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Complaint {0} not found")]
    NotFound(Uuid),

    #[error("Cannot move complaint from {from} to {to}")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Which status changes staff may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may be set from any status.
    #[default]
    Unrestricted,
    /// Status may only advance along pending → in_progress → resolved.
    ForwardOnly,
}

impl TransitionPolicy {
    pub fn allows(&self, from: ComplaintStatus, to: ComplaintStatus) -> bool {
        match self {
            TransitionPolicy::Unrestricted => true,
            TransitionPolicy::ForwardOnly => to.rank() >= from.rank(),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unrestricted" | "any" => Ok(TransitionPolicy::Unrestricted),
            "forward-only" | "forward_only" | "forward" => Ok(TransitionPolicy::ForwardOnly),
            other => Err(format!("Unknown transition policy '{other}'")),
        }
    }
}

/// Client-submitted complaint. Author and status are deliberately absent:
/// unknown fields are ignored during deserialization, so a payload carrying
/// them cannot influence the stored record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: DraftLocation,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub contact: DraftContact,
    #[serde(default)]
    pub images: Vec<MediaHandle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftLocation {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftContact {
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
}

fn required(value: &str, field: &str) -> Result<String, ComplaintError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ComplaintError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn bounded(value: String, field: &str, max: usize) -> Result<String, ComplaintError> {
    if value.chars().count() > max {
        return Err(ComplaintError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value)
}

/// Validate a draft into an insertable record owned by `session`.
///
/// `max_images` is the same count limit uploads are held to.
pub fn validate_draft(
    draft: ComplaintDraft,
    session: &SessionClaims,
    max_images: usize,
) -> Result<NewComplaint, ComplaintError> {
    let title = bounded(required(&draft.title, "Title")?, "Title", MAX_TITLE_LEN)?;
    let category = required(&draft.category, "Category")?;
    let description = bounded(
        required(&draft.description, "Description")?,
        "Description",
        MAX_DESCRIPTION_LEN,
    )?;
    let address = required(&draft.location.address, "Address")?;
    let mobile = required(&draft.contact.mobile, "Contact mobile")?;

    if let Some(coords) = draft.location.coordinates
        && !coords.is_valid()
    {
        return Err(ComplaintError::Validation(
            "Coordinates are out of range".into(),
        ));
    }

    if draft.images.len() > max_images {
        return Err(ComplaintError::Validation(format!(
            "At most {max_images} images may be attached"
        )));
    }
    if draft
        .images
        .iter()
        .any(|h| h.url.trim().is_empty() || h.media_id.trim().is_empty())
    {
        return Err(ComplaintError::Validation(
            "Every image needs a url and mediaId".into(),
        ));
    }

    let email = draft
        .contact
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .or_else(|| Some(session.email.clone()));

    Ok(NewComplaint {
        title,
        category,
        description,
        location: Location {
            address,
            coordinates: draft.location.coordinates,
        },
        priority: draft.priority.unwrap_or_default(),
        contact: Contact { mobile, email },
        images: draft.images,
        status: ComplaintStatus::Pending,
        author_id: session.sub,
    })
}

/// Submit a complaint on behalf of the session's user.
pub async fn submit<S>(
    store: &S,
    session: Option<&SessionClaims>,
    draft: ComplaintDraft,
    max_images: usize,
) -> Result<Complaint, ComplaintError>
where
    S: Store + ?Sized,
{
    let session = session.ok_or(ComplaintError::Unauthenticated)?;
    let new_complaint = validate_draft(draft, session, max_images)?;

    // The token may outlive its account.
    if store.find_user_by_id(session.sub).await?.is_none() {
        return Err(ComplaintError::Unauthenticated);
    }

    let complaint = store
        .insert_complaint(new_complaint)
        .await
        .map_err(|e| match e {
            StoreError::Reference(_) => ComplaintError::Unauthenticated,
            other => ComplaintError::Store(other),
        })?;

    info!(
        complaint_id = %complaint.id,
        author_id = %complaint.author_id,
        category = %complaint.category,
        images = complaint.images.len(),
        "complaint submitted"
    );
    Ok(complaint)
}

pub async fn list<S>(store: &S, filter: &ComplaintFilter) -> Result<Vec<Complaint>, ComplaintError>
where
    S: ComplaintStore + ?Sized,
{
    Ok(store.list_complaints(filter).await?)
}

pub async fn get<S>(store: &S, id: Uuid) -> Result<Complaint, ComplaintError>
where
    S: ComplaintStore + ?Sized,
{
    store
        .find_complaint(id)
        .await?
        .ok_or(ComplaintError::NotFound(id))
}

/// Complaints written by the session's user, newest first.
pub async fn authored_by<S>(
    store: &S,
    session: &SessionClaims,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<Vec<Complaint>, ComplaintError>
where
    S: ComplaintStore + ?Sized,
{
    let filter = ComplaintFilter {
        author_id: Some(session.sub),
        limit,
        offset,
        ..Default::default()
    };
    list(store, &filter).await
}

/// Change a complaint's status. Staff only.
pub async fn update_status<S>(
    store: &S,
    session: &SessionClaims,
    id: Uuid,
    status: ComplaintStatus,
    policy: TransitionPolicy,
) -> Result<Complaint, ComplaintError>
where
    S: ComplaintStore + ?Sized,
{
    if !session.role.is_staff() {
        return Err(ComplaintError::Forbidden(
            "Only employees and admins may change complaint status".into(),
        ));
    }

    let current = get(store, id).await?;
    if !policy.allows(current.status, status) {
        return Err(ComplaintError::InvalidTransition {
            from: current.status,
            to: status,
        });
    }

    let updated = store
        .update_complaint_status(id, status)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => ComplaintError::NotFound(id),
            other => ComplaintError::Store(other),
        })?;

    info!(
        complaint_id = %id,
        from = %current.status,
        to = %updated.status,
        by = %session.sub,
        "complaint status changed"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::{RegisterInput, register};
    use crate::media::DEFAULT_MAX_FILES;
    use crate::models::user::{Role, User};
    use crate::store::memory::MemoryStore;

    async fn user(store: &MemoryStore, email: &str, role: &str) -> User {
        let input = RegisterInput {
            name: "Test".into(),
            email: email.into(),
            password: "secret1".into(),
            mobile: "555-1000".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            role: Some(role.into()),
        };
        register(store, &input, 4).await.unwrap()
    }

    fn claims(user: &User) -> SessionClaims {
        SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            exp: i64::MAX,
            iat: 0,
        }
    }

    fn draft() -> ComplaintDraft {
        serde_json::from_value(serde_json::json!({
            "title": "Pothole on Elm",
            "category": "roads",
            "description": "Large pothole near the school crossing",
            "location": {"address": "12 Elm St", "coordinates": {"lon": -73.98, "lat": 40.75}},
            "contact": {"mobile": "555-1000"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn submit_sets_server_owned_fields() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let complaint = submit(&store, Some(&claims(&alice)), draft(), DEFAULT_MAX_FILES)
            .await
            .unwrap();
        assert_eq!(complaint.status, ComplaintStatus::Pending);
        assert_eq!(complaint.priority, Priority::Medium);
        assert_eq!(complaint.author_id, alice.id);
        assert_eq!(complaint.contact.email.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn client_supplied_author_and_status_are_ignored() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let mallory = Uuid::new_v4();
        let draft: ComplaintDraft = serde_json::from_value(serde_json::json!({
            "title": "Broken light",
            "category": "lighting",
            "description": "Streetlight out",
            "location": {"address": "5 Oak Ave"},
            "contact": {"mobile": "555-1000"},
            "priority": "high",
            "status": "resolved",
            "author": mallory,
            "authorId": mallory
        }))
        .unwrap();
        let complaint = submit(&store, Some(&claims(&alice)), draft, DEFAULT_MAX_FILES)
            .await
            .unwrap();
        assert_eq!(complaint.status, ComplaintStatus::Pending);
        assert_eq!(complaint.author_id, alice.id);
        assert_eq!(complaint.priority, Priority::High);
    }

    #[tokio::test]
    async fn submit_without_session_persists_nothing() {
        let store = MemoryStore::new();
        let err = submit(&store, None, draft(), DEFAULT_MAX_FILES).await.unwrap_err();
        assert!(matches!(err, ComplaintError::Unauthenticated));
        assert_eq!(store.complaint_count().await, 0);
    }

    #[tokio::test]
    async fn session_for_unknown_user_is_unauthenticated() {
        let store = MemoryStore::new();
        let ghost = SessionClaims {
            sub: Uuid::new_v4(),
            email: "ghost@x.com".into(),
            name: "Ghost".into(),
            role: Role::Citizen,
            exp: i64::MAX,
            iat: 0,
        };
        assert!(matches!(
            submit(&store, Some(&ghost), draft(), DEFAULT_MAX_FILES).await,
            Err(ComplaintError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn required_fields_are_enforced() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let session = claims(&alice);

        let cases: [fn(&mut ComplaintDraft); 5] = [
            |d| d.title = "  ".into(),
            |d| d.category.clear(),
            |d| d.description.clear(),
            |d| d.location.address.clear(),
            |d| d.contact.mobile.clear(),
        ];
        for mutate in cases {
            let mut d = draft();
            mutate(&mut d);
            assert!(matches!(
                submit(&store, Some(&session), d, DEFAULT_MAX_FILES).await,
                Err(ComplaintError::Validation(_))
            ));
        }
        assert_eq!(store.complaint_count().await, 0);
    }

    #[tokio::test]
    async fn too_many_images_and_bad_coordinates_are_rejected() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let session = claims(&alice);

        let mut d = draft();
        d.images = (0..6)
            .map(|i| MediaHandle::new(format!("https://img/{i}"), format!("m{i}")))
            .collect();
        assert!(matches!(
            submit(&store, Some(&session), d, DEFAULT_MAX_FILES).await,
            Err(ComplaintError::Validation(_))
        ));

        let mut d = draft();
        d.location.coordinates = Some(Coordinates { lon: 200.0, lat: 0.0 });
        assert!(matches!(
            submit(&store, Some(&session), d, DEFAULT_MAX_FILES).await,
            Err(ComplaintError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn three_images_round_trip_in_order() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let images: Vec<_> = ["c", "a", "b"]
            .iter()
            .map(|n| MediaHandle::new(format!("https://img/{n}.jpg"), format!("complaints/{n}")))
            .collect();
        let mut d = draft();
        d.images = images.clone();
        let created = submit(&store, Some(&claims(&alice)), d, DEFAULT_MAX_FILES).await.unwrap();
        let fetched = get(&store, created.id).await.unwrap();
        assert_eq!(fetched.images, images);
    }

    #[tokio::test]
    async fn image_cap_follows_configured_limit() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let session = claims(&alice);
        let images: Vec<_> = (0..6)
            .map(|i| MediaHandle::new(format!("https://img/{i}"), format!("m{i}")))
            .collect();

        let mut d = draft();
        d.images = images.clone();
        let created = submit(&store, Some(&session), d, 8).await.unwrap();
        assert_eq!(created.images.len(), 6);

        let mut d = draft();
        d.images = images;
        let err = submit(&store, Some(&session), d, 3).await.unwrap_err();
        assert!(matches!(err, ComplaintError::Validation(m) if m.contains("At most 3")));
    }

    #[tokio::test]
    async fn citizens_cannot_change_status() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let complaint = submit(&store, Some(&claims(&alice)), draft(), DEFAULT_MAX_FILES)
            .await
            .unwrap();
        let err = update_status(
            &store,
            &claims(&alice),
            complaint.id,
            ComplaintStatus::Resolved,
            TransitionPolicy::Unrestricted,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ComplaintError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unrestricted_policy_allows_moving_back() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let staff = claims(&user(&store, "e@city.gov", "employee").await);
        let complaint = submit(&store, Some(&claims(&alice)), draft(), DEFAULT_MAX_FILES)
            .await
            .unwrap();
        let policy = TransitionPolicy::Unrestricted;
        update_status(&store, &staff, complaint.id, ComplaintStatus::Resolved, policy)
            .await
            .unwrap();
        let back = update_status(&store, &staff, complaint.id, ComplaintStatus::Pending, policy)
            .await
            .unwrap();
        assert_eq!(back.status, ComplaintStatus::Pending);
    }

    #[tokio::test]
    async fn forward_only_policy_blocks_regression() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let admin = claims(&user(&store, "root@city.gov", "admin").await);
        let complaint = submit(&store, Some(&claims(&alice)), draft(), DEFAULT_MAX_FILES)
            .await
            .unwrap();
        let policy = TransitionPolicy::ForwardOnly;
        update_status(&store, &admin, complaint.id, ComplaintStatus::InProgress, policy)
            .await
            .unwrap();
        let err = update_status(&store, &admin, complaint.id, ComplaintStatus::Pending, policy)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ComplaintError::InvalidTransition {
                from: ComplaintStatus::InProgress,
                to: ComplaintStatus::Pending
            }
        ));
    }

    #[tokio::test]
    async fn update_status_of_missing_complaint_is_not_found() {
        let store = MemoryStore::new();
        let admin = claims(&user(&store, "root@city.gov", "admin").await);
        let id = Uuid::new_v4();
        assert!(matches!(
            update_status(&store, &admin, id, ComplaintStatus::Resolved, Default::default()).await,
            Err(ComplaintError::NotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn authored_by_only_returns_own_complaints() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com", "citizen").await;
        let bob = user(&store, "b@x.com", "citizen").await;
        submit(&store, Some(&claims(&alice)), draft(), DEFAULT_MAX_FILES).await.unwrap();
        submit(&store, Some(&claims(&bob)), draft(), DEFAULT_MAX_FILES).await.unwrap();
        let mine = authored_by(&store, &claims(&alice), None, None).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].author_id, alice.id);
    }

    #[test]
    fn transition_policy_parses() {
        assert_eq!(
            "forward-only".parse::<TransitionPolicy>(),
            Ok(TransitionPolicy::ForwardOnly)
        );
        assert_eq!(
            "Unrestricted".parse::<TransitionPolicy>(),
            Ok(TransitionPolicy::Unrestricted)
        );
        assert!("sideways".parse::<TransitionPolicy>().is_err());
    }
}
