use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Cursor, FeedPage, FeedQuery, NewPost, PostDetail};
use crate::error::ApiError;

/// Paginated post listings.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the page after `cursor` (`None` = first page).
    /// `viewer` personalizes the liked-by-viewer flags.
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&Cursor>,
        viewer: Option<Uuid>,
    ) -> Result<FeedPage, ApiError>;
}

/// Single-post reads and post writes.
#[async_trait]
pub trait PostApi: Send + Sync {
    /// Load one post. `viewer` personalizes the liked-by-viewer flag.
    async fn get_post(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<PostDetail>, ApiError>;

    /// Like a post. Returns the authoritative like count.
    async fn like(&self, post_id: Uuid, viewer_id: Uuid) -> Result<u64, ApiError>;

    /// Remove a like. Returns the authoritative like count.
    async fn unlike(&self, post_id: Uuid, viewer_id: Uuid) -> Result<u64, ApiError>;

    async fn create(&self, post: NewPost) -> Result<Uuid, ApiError>;

    async fn delete(&self, post_id: Uuid) -> Result<(), ApiError>;
}
