//! Optimistic like/unlike.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::FeedPage;
use crate::error::ClientError;
use crate::ports::PostApi;
use crate::profile::ProfileStore;
use crate::reconciler::Reconciler;

/// Per-post, per-viewer like flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LikeState {
    /// Optimistic target while `pending`, confirmed value otherwise.
    pub liked: bool,
    pub pending: bool,
}

/// Result of a confirmed like/unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeConfirmation {
    pub post_id: Uuid,
    pub liked: bool,
    /// Authoritative count returned by the server.
    pub like_count: u64,
}

pub struct LikeReconciler {
    profiles: Arc<ProfileStore>,
    api: Arc<dyn PostApi>,
    likes: Reconciler<(Uuid, Uuid), bool>,
    counts: Mutex<HashMap<Uuid, u64>>,
}

impl LikeReconciler {
    pub fn new(profiles: Arc<ProfileStore>, api: Arc<dyn PostApi>) -> Self {
        Self {
            profiles,
            api,
            likes: Reconciler::new(),
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn like_state(&self, post_id: Uuid, viewer_id: Uuid) -> LikeState {
        self.likes
            .get(&(post_id, viewer_id))
            .map(|slot| LikeState {
                liked: slot.value,
                pending: slot.pending,
            })
            .unwrap_or_default()
    }

    pub fn like_count(&self, post_id: Uuid) -> Option<u64> {
        self.counts.lock().get(&post_id).copied()
    }

    /// Prime local state from server data.
    pub fn seed(&self, post_id: Uuid, viewer_id: Option<Uuid>, liked: bool, like_count: u64) {
        if let Some(viewer_id) = viewer_id {
            self.likes.seed((post_id, viewer_id), liked);
        }
        self.counts.lock().insert(post_id, like_count);
    }

    pub fn seed_page(&self, viewer_id: Option<Uuid>, page: &FeedPage) {
        for post in &page.posts {
            self.seed(post.id, viewer_id, post.liked_by_viewer, post.like_count);
        }
    }

    /// Drop all viewer-scoped state (sign-out).
    pub fn clear(&self) {
        self.likes.clear();
        self.counts.lock().clear();
    }

    /// Like or unlike as the currently ready profile.
    pub async fn apply_as_current(
        &self,
        post_id: Uuid,
        target_liked: bool,
    ) -> Result<LikeConfirmation, ClientError> {
        let viewer_id = self.profiles.viewer_id();
        self.apply(post_id, viewer_id, target_liked).await
    }

    /// Set the like flag optimistically and confirm it with the server.
    ///
    /// Without a viewer nothing is sent or changed. The like count is never
    /// adjusted locally; it is replaced by the count the server returns.
    pub async fn apply(
        &self,
        post_id: Uuid,
        viewer_id: Option<Uuid>,
        target_liked: bool,
    ) -> Result<LikeConfirmation, ClientError> {
        let viewer_id = viewer_id.ok_or(ClientError::Unauthenticated)?;
        let api = &self.api;

        let (result, landed) = self
            .likes
            .apply_tracked((post_id, viewer_id), target_liked, || async move {
                let response = if target_liked {
                    api.like(post_id, viewer_id).await
                } else {
                    api.unlike(post_id, viewer_id).await
                };
                response.map_err(ClientError::from)
            })
            .await;
        let like_count = result?;

        // A sign-out during the call cleared the cache; keep it cleared.
        if landed {
            self.counts.lock().insert(post_id, like_count);
        }
        tracing::debug!(%post_id, liked = target_liked, like_count, "Like confirmed");

        Ok(LikeConfirmation {
            post_id,
            liked: target_liked,
            like_count,
        })
    }
}
