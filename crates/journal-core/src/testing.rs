//! Scripted port fakes for unit tests.
//!
//! Every call pops the next scripted reply. A reply can be held open with
//! [`Script::hold`] so a test can interleave other work while the call is
//! suspended, then release it through the returned sender.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::domain::{
    AuthorSummary, Category, Cursor, ExternalIdentity, FeedPage, FeedQuery, NewPost, NewProfile,
    PostDetail, PostSummary, Profile,
};
use crate::error::ApiError;
use crate::ports::{FeedSource, IdentityProvider, PostApi, ProfileApi};

type Reply<T> = Result<T, ApiError>;

enum Scripted<T> {
    Ready(Reply<T>),
    Held(oneshot::Receiver<Reply<T>>),
}

pub struct Script<T> {
    replies: Mutex<VecDeque<Scripted<T>>>,
    calls: AtomicUsize,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<T> Script<T> {
    pub fn push_ok(&self, value: T) {
        self.replies.lock().push_back(Scripted::Ready(Ok(value)));
    }

    pub fn push_err(&self, err: ApiError) {
        self.replies.lock().push_back(Scripted::Ready(Err(err)));
    }

    /// Queue a reply that stays pending until the sender is used.
    pub fn hold(&self) -> oneshot::Sender<Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().push_back(Scripted::Held(rx));
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Reply<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.replies.lock().pop_front();
        match scripted {
            Some(Scripted::Ready(reply)) => reply,
            Some(Scripted::Held(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Network("held reply dropped".into()))),
            None => Err(ApiError::Network("no scripted reply".into())),
        }
    }
}

/// One fake implementing every port.
#[derive(Default)]
pub struct FakeBackend {
    pub lookups: Script<Option<Profile>>,
    pub username_checks: Script<bool>,
    pub creations: Script<Profile>,
    pub pages: Script<FeedPage>,
    pub post_reads: Script<Option<PostDetail>>,
    pub likes: Script<u64>,
    pub post_creations: Script<Uuid>,
    pub deletions: Script<()>,
    pub verifications: Script<()>,
    pub requested_cursors: Mutex<Vec<Option<Cursor>>>,
    pub created_profiles: Mutex<Vec<NewProfile>>,
    pub created_posts: Mutex<Vec<NewPost>>,
}

#[async_trait]
impl ProfileApi for FakeBackend {
    async fn find_by_external_id(&self, _external_id: &str) -> Result<Option<Profile>, ApiError> {
        self.lookups.next().await
    }

    async fn username_exists(&self, _username: &str) -> Result<bool, ApiError> {
        self.username_checks.next().await
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, ApiError> {
        self.created_profiles.lock().push(profile);
        self.creations.next().await
    }
}

#[async_trait]
impl FeedSource for FakeBackend {
    async fn fetch_page(
        &self,
        _query: &FeedQuery,
        cursor: Option<&Cursor>,
        _viewer: Option<Uuid>,
    ) -> Result<FeedPage, ApiError> {
        self.requested_cursors.lock().push(cursor.cloned());
        self.pages.next().await
    }
}

#[async_trait]
impl PostApi for FakeBackend {
    async fn get_post(
        &self,
        _post_id: Uuid,
        _viewer: Option<Uuid>,
    ) -> Result<Option<PostDetail>, ApiError> {
        self.post_reads.next().await
    }

    async fn like(&self, _post_id: Uuid, _viewer_id: Uuid) -> Result<u64, ApiError> {
        self.likes.next().await
    }

    async fn unlike(&self, _post_id: Uuid, _viewer_id: Uuid) -> Result<u64, ApiError> {
        self.likes.next().await
    }

    async fn create(&self, post: NewPost) -> Result<Uuid, ApiError> {
        self.created_posts.lock().push(post);
        self.post_creations.next().await
    }

    async fn delete(&self, _post_id: Uuid) -> Result<(), ApiError> {
        self.deletions.next().await
    }
}

#[async_trait]
impl IdentityProvider for FakeBackend {
    async fn send_verification_email(&self, _identity: &ExternalIdentity) -> Result<(), ApiError> {
        self.verifications.next().await
    }
}

/// Let spawned tasks run until they block on a held reply.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub fn identity(uid: &str) -> ExternalIdentity {
    ExternalIdentity::new(uid).with_display_name(format!("User {uid}"))
}

pub fn profile(uid: &str, username: &str) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        external_id: uid.to_string(),
        username: username.to_string(),
        name: format!("User {uid}"),
        bio: None,
        photo_url: None,
        created_at: Utc::now(),
    }
}

pub fn post(id: Uuid, author: &str) -> PostSummary {
    PostSummary {
        id,
        title: format!("Post {id}"),
        thumbnail: "https://img.example/thumb.png".to_string(),
        category: Category::Tech,
        other_category: None,
        author: AuthorSummary {
            name: author.to_string(),
            username: author.to_string(),
            photo_url: None,
        },
        created_at: Utc::now(),
        like_count: 0,
        liked_by_viewer: false,
    }
}

pub fn page(ids: &[Uuid], next: Option<i64>) -> FeedPage {
    FeedPage {
        posts: ids.iter().map(|id| post(*id, "author")).collect(),
        next_cursor: next.map(|n| Cursor::from_value(serde_json::json!(n))),
    }
}
