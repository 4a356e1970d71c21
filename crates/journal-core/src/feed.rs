//! Cursor-based feed paginator.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{Cursor, FeedPage, FeedQuery, PostSummary};
use crate::error::ClientError;
use crate::ports::FeedSource;
use crate::profile::ProfileStore;

/// Outcome of [`FeedPaginator::load_more`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedLoad {
    /// Posts appended by this load (duplicates already dropped) and the
    /// cursor the server sent with them.
    Page(FeedPage),
    /// The feed has no more pages.
    End,
    /// The feed was reset while this load was in flight; its page was
    /// dropped.
    Discarded,
}

struct FeedState {
    query: FeedQuery,
    /// Bumped on reset; loads started under an older epoch are dropped.
    epoch: u64,
    posts: Vec<PostSummary>,
    seen: HashSet<Uuid>,
    cursor: Option<Cursor>,
    exhausted: bool,
    in_flight: bool,
}

impl FeedState {
    fn new(query: FeedQuery, epoch: u64) -> Self {
        Self {
            query,
            epoch,
            posts: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            exhausted: false,
            in_flight: false,
        }
    }
}

/// Accumulates pages of one feed in request order.
pub struct FeedPaginator {
    source: Arc<dyn FeedSource>,
    profiles: Option<Arc<ProfileStore>>,
    state: Mutex<FeedState>,
}

impl FeedPaginator {
    pub fn new(source: Arc<dyn FeedSource>, query: FeedQuery) -> Self {
        Self {
            source,
            profiles: None,
            state: Mutex::new(FeedState::new(query, 0)),
        }
    }

    /// Personalize requests with the ready profile's id.
    pub fn with_profiles(mut self, profiles: Arc<ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn query(&self) -> FeedQuery {
        self.state.lock().query.clone()
    }

    pub fn posts(&self) -> Vec<PostSummary> {
        self.state.lock().posts.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.lock().exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Drop everything loaded so far and start over on `query`.
    pub fn reset(&self, query: FeedQuery) {
        let mut state = self.state.lock();
        let epoch = state.epoch + 1;
        tracing::debug!(?query, epoch, "Feed reset");
        *state = FeedState::new(query, epoch);
    }

    /// Remove a post from the accumulated sequence (e.g. after deletion).
    pub fn remove(&self, post_id: Uuid) -> bool {
        let mut state = self.state.lock();
        let before = state.posts.len();
        state.posts.retain(|post| post.id != post_id);
        state.posts.len() != before
    }

    /// Fetch the next page.
    ///
    /// Only one load runs at a time; a call while one is outstanding returns
    /// [`ClientError::Busy`] without a request. A failed or abandoned load
    /// leaves the cursor in place so the next call repeats the same request.
    pub async fn load_more(&self) -> Result<FeedLoad, ClientError> {
        let (mut guard, query, cursor) = {
            let mut state = self.state.lock();
            if state.exhausted {
                return Ok(FeedLoad::End);
            }
            if state.in_flight {
                return Err(ClientError::Busy);
            }
            state.in_flight = true;
            let guard = LoadGuard {
                state: &self.state,
                epoch: state.epoch,
                armed: true,
            };
            (guard, state.query.clone(), state.cursor.clone())
        };

        let viewer = self.profiles.as_ref().and_then(|p| p.viewer_id());
        let result = self
            .source
            .fetch_page(&query, cursor.as_ref(), viewer)
            .await;

        let mut state = self.state.lock();
        guard.armed = false;
        let epoch = guard.epoch;
        if state.epoch != epoch {
            tracing::debug!(epoch, current = state.epoch, "Discarding stale feed page");
            return Ok(FeedLoad::Discarded);
        }
        state.in_flight = false;

        let FeedPage { posts, next_cursor } = result.map_err(|e| {
            tracing::warn!(?query, error = %e, "Feed page failed");
            ClientError::from(e)
        })?;

        if posts.is_empty() && next_cursor.is_none() {
            state.exhausted = true;
            tracing::debug!(?query, total = state.posts.len(), "Feed exhausted");
            return Ok(FeedLoad::End);
        }

        let received = posts.len();
        let fresh: Vec<PostSummary> = posts
            .into_iter()
            .filter(|post| state.seen.insert(post.id))
            .collect();

        state.posts.extend(fresh.iter().cloned());
        state.exhausted = next_cursor.is_none();
        state.cursor = next_cursor.clone();

        tracing::debug!(
            ?query,
            received,
            appended = fresh.len(),
            total = state.posts.len(),
            "Feed page loaded"
        );

        Ok(FeedLoad::Page(FeedPage {
            posts: fresh,
            next_cursor,
        }))
    }
}

/// Releases the single-flight flag if a load is dropped mid-request.
struct LoadGuard<'a> {
    state: &'a Mutex<FeedState>,
    epoch: u64,
    armed: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if state.epoch == self.epoch {
            tracing::debug!(epoch = self.epoch, "Feed load abandoned");
            state.in_flight = false;
        }
    }
}
