use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, ImageSource};

/// Opaque pagination token issued by the server.
///
/// Passed back verbatim on the next request; the client never builds or
/// edits one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(serde_json::Value);

impl Cursor {
    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author block shown on a post card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub name: String,
    pub username: String,
    pub photo_url: Option<String>,
}

/// A post as listed in a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub thumbnail: String,
    pub category: Category,
    pub other_category: Option<String>,
    pub author: AuthorSummary,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub liked_by_viewer: bool,
}

impl PostSummary {
    /// Label rendered on the category badge.
    pub fn category_label(&self) -> &str {
        match (&self.category, &self.other_category) {
            (Category::Other, Some(other)) => other,
            (category, _) => category.as_str(),
        }
    }
}

/// A single post with its body, as shown on the post page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub summary: PostSummary,
    /// Editor HTML.
    pub body: String,
}

/// One page of a feed. An absent cursor marks the end of the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<PostSummary>,
    pub next_cursor: Option<Cursor>,
}

/// Which listing a paginator walks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedQuery {
    /// Recent posts from everyone.
    Home,
    /// Posts written by one user.
    User { username: String },
}

/// Payload of a post-creation call, built from a validated draft.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub title: String,
    pub category: Category,
    pub other_category: Option<String>,
    pub thumbnail: ImageSource,
    pub body: String,
}
