//! Data Transfer Objects - request/response types for the API.
//!
//! Request fields are optional where a missing value must surface as a
//! validation message rather than a deserialization failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pagination query accepted by every list endpoint. `limit` and `per_page` are aliases.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub per_page: Option<u64>,
}

impl PageQuery {
    /// `(page, per_page)`; a missing page is the first one and `limit` wins over `per_page`.
    pub fn resolve(&self, default_per_page: u64) -> (u64, u64) {
        (
            self.page.unwrap_or(1),
            self.limit.or(self.per_page).unwrap_or(default_per_page),
        )
    }
}

/// Request to register a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request to login. `username` is matched against username or email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Response containing an access token. The refresh token travels in a cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Partial update of the caller's profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

/// The caller's own account, including private fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A new post; images are base64-encoded (at most two).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Replacement content for a post or comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: Option<i64>,
    pub content: Option<String>,
}

/// A stored post as returned by create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored comment as returned by create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user who liked a post or comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikerResponse {
    pub user_id: i64,
    pub username: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeCountResponse {
    pub likes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsFollowingResponse {
    pub is_following: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
