//! Post write actions: optimistic delete and draft submission.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use crate::domain::{Category, DraftPost, NewPost, PostDetail, PostSummary};
use crate::error::ClientError;
use crate::ports::PostApi;
use crate::profile::ProfileStore;
use crate::reconciler::Reconciler;
use crate::validation;

/// Deletes posts owned by the ready profile.
///
/// A deleted post is hidden as soon as the call starts and shown again if
/// the call fails.
pub struct PostActions {
    profiles: Arc<ProfileStore>,
    api: Arc<dyn PostApi>,
    hidden: Reconciler<Uuid, bool>,
}

impl PostActions {
    pub fn new(profiles: Arc<ProfileStore>, api: Arc<dyn PostApi>) -> Self {
        Self {
            profiles,
            api,
            hidden: Reconciler::new(),
        }
    }

    pub fn is_hidden(&self, post_id: Uuid) -> bool {
        self.hidden.get(&post_id).is_some_and(|slot| slot.value)
    }

    pub fn is_deleting(&self, post_id: Uuid) -> bool {
        self.hidden.is_pending(&post_id)
    }

    /// Load one post, personalized for the ready profile if there is one.
    pub async fn fetch(&self, post_id: Uuid) -> Result<Option<PostDetail>, ClientError> {
        let viewer = self.profiles.viewer_id();
        let post = self.api.get_post(post_id, viewer).await.map_err(|e| {
            tracing::warn!(%post_id, error = %e, "Post load failed");
            ClientError::from(e)
        })?;

        if post.is_none() {
            tracing::debug!(%post_id, "Post not found");
        }
        Ok(post)
    }

    pub async fn delete(&self, post: &PostSummary) -> Result<(), ClientError> {
        let profile = self.profiles.profile().ok_or(ClientError::Unauthenticated)?;
        if profile.username != post.author.username {
            return Err(ClientError::InvalidState("only the author can delete a post"));
        }

        let post_id = post.id;
        let api = &self.api;
        self.hidden
            .apply(post_id, true, || async move {
                api.delete(post_id).await.map_err(ClientError::from)
            })
            .await?;

        tracing::info!(%post_id, "Post deleted");
        Ok(())
    }
}

/// Submits drafts that pass validation.
pub struct PostComposer {
    profiles: Arc<ProfileStore>,
    api: Arc<dyn PostApi>,
    submitting: AtomicBool,
}

impl PostComposer {
    pub fn new(profiles: Arc<ProfileStore>, api: Arc<dyn PostApi>) -> Self {
        Self {
            profiles,
            api,
            submitting: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Submit a draft as the ready profile. Returns the new post's id.
    ///
    /// The draft is consumed: it is either sent whole or rejected.
    pub async fn submit(&self, draft: DraftPost) -> Result<Uuid, ClientError> {
        let author_id = self.profiles.viewer_id().ok_or(ClientError::Unauthenticated)?;

        if let Some(error) = validation::first_error(&draft) {
            return Err(ClientError::Validation(error.to_string()));
        }

        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::Busy);
        }
        let _submitting = SubmitGuard(&self.submitting);

        self.send(author_id, draft).await
    }

    async fn send(&self, author_id: Uuid, draft: DraftPost) -> Result<Uuid, ClientError> {
        let (Some(category), Some(thumbnail)) = (draft.category, draft.thumbnail) else {
            return Err(ClientError::Validation("incomplete draft".into()));
        };

        let other_category = (category == Category::Other)
            .then(|| draft.other_category.trim().to_string());

        let post = NewPost {
            author_id,
            title: draft.title.trim().to_string(),
            category,
            other_category,
            thumbnail,
            body: draft.body,
        };

        let post_id = self.api.create(post).await.map_err(|e| {
            tracing::warn!(error = %e, "Post creation failed");
            ClientError::from(e)
        })?;

        tracing::info!(%post_id, "Post created");
        Ok(post_id)
    }
}

/// Clears the submitting flag when the submission ends or is dropped.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
