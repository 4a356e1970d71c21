//! Application context - the one owned state object per client instance.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::{FeedQuery, PostDetail};
use crate::error::ClientError;
use crate::feed::FeedPaginator;
use crate::likes::LikeReconciler;
use crate::ports::{FeedSource, IdentityProvider, PostApi, ProfileApi};
use crate::posts::{PostActions, PostComposer};
use crate::profile::{ProfileState, ProfileStore};
use crate::session::SessionStore;

/// The backend collaborators a context is built from.
#[derive(Clone)]
pub struct Backends {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileApi>,
    pub feed: Arc<dyn FeedSource>,
    pub posts: Arc<dyn PostApi>,
}

impl Backends {
    /// Use one backend for every port.
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: IdentityProvider + ProfileApi + FeedSource + PostApi + 'static,
    {
        Self {
            identity: backend.clone(),
            profiles: backend.clone(),
            feed: backend.clone(),
            posts: backend,
        }
    }
}

/// Owns the stores and hands them to views by reference.
///
/// Created once at startup; [`JournalContext::start`] wires the session to
/// the profile store and [`JournalContext::sign_out`] resets viewer state.
pub struct JournalContext {
    pub session: Arc<SessionStore>,
    pub profiles: Arc<ProfileStore>,
    pub likes: Arc<LikeReconciler>,
    pub posts: Arc<PostActions>,
    pub composer: Arc<PostComposer>,
    feed: Arc<dyn FeedSource>,
    sync: Mutex<Option<JoinHandle<()>>>,
}

impl JournalContext {
    pub fn new(backends: Backends) -> Self {
        let session = Arc::new(SessionStore::new(backends.identity));
        let profiles = Arc::new(ProfileStore::new(backends.profiles));
        let likes = Arc::new(LikeReconciler::new(profiles.clone(), backends.posts.clone()));
        let posts = Arc::new(PostActions::new(profiles.clone(), backends.posts.clone()));
        let composer = Arc::new(PostComposer::new(profiles.clone(), backends.posts));

        Self {
            session,
            profiles,
            likes,
            posts,
            composer,
            feed: backends.feed,
            sync: Mutex::new(None),
        }
    }

    /// Start following the session. Calling it again is a no-op.
    pub fn start(&self) {
        let mut sync = self.sync.lock();
        if sync.is_none() {
            *sync = Some(self.profiles.spawn_sync(self.session.subscribe()));
            tracing::debug!("Profile sync started");
        }
    }

    /// A paginator for `query`, personalized for the ready profile.
    pub fn paginator(&self, query: FeedQuery) -> FeedPaginator {
        FeedPaginator::new(self.feed.clone(), query).with_profiles(self.profiles.clone())
    }

    /// Load a single post and prime the like state from it.
    pub async fn open_post(&self, post_id: Uuid) -> Result<Option<PostDetail>, ClientError> {
        let post = self.posts.fetch(post_id).await?;
        if let Some(detail) = &post {
            let summary = &detail.summary;
            self.likes.seed(
                summary.id,
                self.profiles.viewer_id(),
                summary.liked_by_viewer,
                summary.like_count,
            );
        }
        Ok(post)
    }

    /// Wait until the profile store has finished resolving the session's
    /// current identity. Starts the sync task if it is not running yet.
    pub async fn settled(&self) -> ProfileState {
        self.start();
        let session = self.session.clone();
        let mut states = self.profiles.subscribe();
        let caught_up = move |state: &ProfileState| {
            state.is_settled() && state.identity() == session.current().as_ref()
        };
        match states.wait_for(caught_up).await {
            Ok(state) => state.clone(),
            Err(_) => self.profiles.state(),
        }
    }

    /// Clear the session and every viewer-scoped cache.
    pub fn sign_out(&self) {
        self.session.sign_out();
        self.likes.clear();
    }
}

impl Drop for JournalContext {
    fn drop(&mut self) {
        if let Some(handle) = self.sync.lock().take() {
            handle.abort();
        }
    }
}
