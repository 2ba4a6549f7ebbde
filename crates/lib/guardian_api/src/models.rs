//! Request and response bodies.

use guardian_core::auth::identity::RegisterInput;
use guardian_core::models::auth::SessionClaims;
use guardian_core::models::complaint::{Complaint, ComplaintFilter, ComplaintStatus, Priority};
use guardian_core::models::media::MediaHandle;
use guardian_core::models::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub version: String,
    pub store_connected: bool,
}

/// Missing fields deserialize as empty so that field validation reports them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(alias = "mobile")]
    pub phone: String,
    pub address: String,
    pub city: String,
    pub role: Option<String>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        RegisterInput {
            name: req.name,
            email: req.email,
            password: req.password,
            mobile: req.phone,
            address: req.address,
            city: req.city,
            role: req.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session: SessionClaims,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: User,
    pub complaint_ids: Vec<Uuid>,
}

/// `null` or absent clears the avatar.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AvatarRequest {
    pub avatar: Option<MediaHandle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub images: Vec<MediaHandle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InlineUploadRequest {
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintResponse {
    pub complaint: Complaint,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintListResponse {
    pub items: Vec<Complaint>,
    pub limit: u32,
    pub offset: u32,
}

/// `GET /api/complaints` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<ComplaintStatus>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListQuery> for ComplaintFilter {
    fn from(q: ListQuery) -> Self {
        ComplaintFilter {
            author_id: None,
            status: q.status,
            category: q.category.filter(|c| !c.trim().is_empty()),
            priority: q.priority,
            limit: q.limit,
            offset: q.offset,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ComplaintStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_accepts_mobile_alias() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@b.co","mobile":"555"}"#).unwrap();
        let input = RegisterInput::from(req);
        assert_eq!(input.mobile, "555");
        assert!(input.password.is_empty());
    }

    #[test]
    fn blank_category_is_not_a_filter() {
        let filter = ComplaintFilter::from(ListQuery {
            category: Some("  ".into()),
            ..Default::default()
        });
        assert!(filter.category.is_none());
    }
}
