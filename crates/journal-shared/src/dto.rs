//! Data Transfer Objects - request/response bodies of the journal backend.
//!
//! Field names follow the backend's JSON (camelCase, `photoURL`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to look up the user bound to an identity-provider id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserRequest {
    pub uid: String,
}

/// A user record as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub uid: String,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(rename = "photoURL", default)]
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response of get-user and create-user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: Option<UserDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckUsernameRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckUsernameResponse {
    pub exists: bool,
}

/// The `user` part of the create-user multipart form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    pub uid: String,
    pub username: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Image URL when no file is attached.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationRequest {
    pub uid: String,
    pub email: Option<String>,
}

/// Request for one page of the home or a user's feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPageRequest {
    /// Cursor from the previous response, echoed verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPageResponse {
    #[serde(default)]
    pub posts: Vec<PostDto>,
    #[serde(default)]
    pub next_page: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    pub name: String,
    pub username: String,
    #[serde(rename = "photoURL", default)]
    pub photo_url: Option<String>,
}

/// A post as listed by the feed endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: Uuid,
    pub title: String,
    pub thumbnail: String,
    pub category: String,
    #[serde(default)]
    pub other_category: Option<String>,
    #[serde(rename = "User")]
    pub user: AuthorDto,
    pub created_at: DateTime<Utc>,
    /// Ids of the users who liked the post.
    #[serde(default)]
    pub likes: Vec<Uuid>,
    #[serde(default)]
    pub like_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPostRequest {
    pub post_id: Uuid,
}

/// A post with its editor content, as returned by get-post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetailDto {
    #[serde(flatten)]
    pub post: PostDto,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPostResponse {
    #[serde(default)]
    pub post: Option<PostDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub post_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub like_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostRequest {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub id: Uuid,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
