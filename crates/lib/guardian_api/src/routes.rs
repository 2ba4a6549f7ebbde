//! Route paths.

pub const GET_API_HEALTH: &str = "/api/health";

pub const POST_AUTH_REGISTER: &str = "/api/auth/register";
pub const POST_AUTH_LOGIN: &str = "/api/auth/login";
pub const POST_AUTH_LOGOUT: &str = "/api/auth/logout";
pub const GET_AUTH_SESSION: &str = "/api/auth/session";

pub const GET_USERS_ME: &str = "/api/users/me";
pub const PUT_USERS_ME_AVATAR: &str = "/api/users/me/avatar";

/// `POST` multipart, `PUT` base64 JSON.
pub const UPLOAD: &str = "/api/upload";

/// `GET` lists, `POST` submits.
pub const COMPLAINTS: &str = "/api/complaints";
pub const GET_COMPLAINTS_MINE: &str = "/api/complaints/mine";
pub const GET_COMPLAINT_ID: &str = "/api/complaints/{id}";
pub const PATCH_COMPLAINT_STATUS: &str = "/api/complaints/{id}/status";
