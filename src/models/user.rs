//! User DTOs for sessions and the admin user list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::user;

/// User info returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub is_admin: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            uid: u.uid,
            display_name: u.display_name,
            email: u.email,
            photo_url: u.photo_url,
            is_admin: u.is_admin,
            last_seen_at: u.last_seen_at,
            created_at: u.created_at,
        }
    }
}

/// Paginated admin user list.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub pagination: super::Pagination,
}

/// Body of `/auth/me` and `/auth/session`; `user` is null when signed out.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub user: Option<UserResponse>,
}

/// Profile edit. Omitted fields are unchanged; blank strings clear them.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Admin flag toggle.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

/// Result of the admin check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminCheckResponse {
    pub is_admin: bool,
    pub uid: String,
}
