use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use journal_core::domain::{
    AuthorSummary, Cursor, ExternalIdentity, FeedPage, FeedQuery, ImageSource, NewPost,
    NewProfile, PostDetail, PostSummary, Profile,
};
use journal_core::error::ApiError;
use journal_core::ports::{FeedSource, IdentityProvider, PostApi, ProfileApi};

/// In-memory backend configuration.
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    /// Posts per feed page.
    pub page_size: usize,
    /// Artificial delay applied to every call.
    pub latency: Option<Duration>,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            latency: None,
        }
    }
}

/// Calls that can be made to fail with [`InMemoryBackend::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindProfile,
    CheckUsername,
    CreateProfile,
    FetchPage,
    GetPost,
    Like,
    Unlike,
    CreatePost,
    DeletePost,
    SendVerification,
}

struct StoredPost {
    summary: PostSummary,
    body: String,
    likes: HashSet<Uuid>,
}

#[derive(Default)]
struct Tables {
    /// Keyed by external identity id.
    profiles: HashMap<String, Profile>,
    /// Newest first.
    posts: Vec<StoredPost>,
    verification_requests: Vec<String>,
}

/// Backend serving every port from process memory.
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
    failures: Mutex<HashMap<Operation, VecDeque<ApiError>>>,
    config: InMemoryConfig,
}

impl InMemoryBackend {
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            failures: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Make the next call of `operation` fail with `error`.
    pub async fn fail_next(&self, operation: Operation, error: ApiError) {
        self.failures
            .lock()
            .await
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Store a profile as if its onboarding had already happened.
    pub async fn insert_profile(&self, profile: Profile) {
        let mut tables = self.tables.write().await;
        tables.profiles.insert(profile.external_id.clone(), profile);
    }

    /// Publish a post as the newest one.
    pub async fn publish(&self, post: PostSummary) {
        let mut tables = self.tables.write().await;
        tables.posts.insert(
            0,
            StoredPost {
                summary: post,
                body: String::new(),
                likes: HashSet::new(),
            },
        );
    }

    pub async fn post_count(&self) -> usize {
        self.tables.read().await.posts.len()
    }

    pub async fn post_body(&self, post_id: Uuid) -> Option<String> {
        let tables = self.tables.read().await;
        tables
            .posts
            .iter()
            .find(|p| p.summary.id == post_id)
            .map(|p| p.body.clone())
    }

    pub async fn verification_requests(&self) -> Vec<String> {
        self.tables.read().await.verification_requests.clone()
    }

    /// Simulated latency, then any injected failure.
    async fn enter(&self, operation: Operation) -> Result<(), ApiError> {
        if let Some(latency) = self.config.latency {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .failures
            .lock()
            .await
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);

        match injected {
            Some(error) => {
                tracing::debug!(?operation, error = %error, "Injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn page_index(cursor: Option<&Cursor>) -> Result<usize, ApiError> {
        match cursor {
            None => Ok(0),
            Some(cursor) => cursor
                .as_value()
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| ApiError::Server {
                    status: 400,
                    message: format!("invalid page cursor {cursor}"),
                }),
        }
    }

    fn image_url(image: &ImageSource) -> String {
        match image {
            ImageSource::Url(url) => url.clone(),
            ImageSource::File(file) => format!("memory://uploads/{}", file.name),
        }
    }

    async fn set_like(&self, post_id: Uuid, viewer_id: Uuid, liked: bool) -> Result<u64, ApiError> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.summary.id == post_id)
            .ok_or(ApiError::NotFound)?;

        if liked {
            post.likes.insert(viewer_id);
        } else {
            post.likes.remove(&viewer_id);
        }
        post.summary.like_count = post.likes.len() as u64;
        Ok(post.summary.like_count)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryBackend {
    async fn send_verification_email(&self, identity: &ExternalIdentity) -> Result<(), ApiError> {
        self.enter(Operation::SendVerification).await?;
        let mut tables = self.tables.write().await;
        tables.verification_requests.push(identity.uid.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileApi for InMemoryBackend {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Profile>, ApiError> {
        self.enter(Operation::FindProfile).await?;
        Ok(self.tables.read().await.profiles.get(external_id).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, ApiError> {
        self.enter(Operation::CheckUsername).await?;
        let tables = self.tables.read().await;
        Ok(tables.profiles.values().any(|p| p.username == username))
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, ApiError> {
        self.enter(Operation::CreateProfile).await?;
        let mut tables = self.tables.write().await;

        if tables.profiles.contains_key(&profile.external_id) {
            return Err(ApiError::Conflict("profile already exists".into()));
        }
        if tables
            .profiles
            .values()
            .any(|p| p.username == profile.username)
        {
            return Err(ApiError::Conflict(format!(
                "username {} already exists",
                profile.username
            )));
        }

        let created = Profile {
            id: Uuid::new_v4(),
            external_id: profile.external_id,
            username: profile.username,
            name: profile.name,
            bio: profile.bio,
            photo_url: profile.image.as_ref().map(Self::image_url),
            created_at: Utc::now(),
        };
        tables
            .profiles
            .insert(created.external_id.clone(), created.clone());

        tracing::debug!(username = %created.username, "Profile created");
        Ok(created)
    }
}

#[async_trait]
impl FeedSource for InMemoryBackend {
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&Cursor>,
        viewer: Option<Uuid>,
    ) -> Result<FeedPage, ApiError> {
        self.enter(Operation::FetchPage).await?;
        let index = Self::page_index(cursor)?;
        let size = self.config.page_size.max(1);

        let tables = self.tables.read().await;
        let matching: Vec<&StoredPost> = tables
            .posts
            .iter()
            .filter(|p| match query {
                FeedQuery::Home => true,
                FeedQuery::User { username } => p.summary.author.username == *username,
            })
            .collect();

        let start = index.saturating_mul(size);
        let posts: Vec<PostSummary> = matching
            .iter()
            .skip(start)
            .take(size)
            .map(|p| PostSummary {
                liked_by_viewer: viewer.is_some_and(|v| p.likes.contains(&v)),
                ..p.summary.clone()
            })
            .collect();

        let next_cursor = (start.saturating_add(size) < matching.len())
            .then(|| Cursor::from_value(serde_json::json!(index + 1)));

        Ok(FeedPage { posts, next_cursor })
    }
}

#[async_trait]
impl PostApi for InMemoryBackend {
    async fn get_post(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<PostDetail>, ApiError> {
        self.enter(Operation::GetPost).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.summary.id == post_id)
            .map(|p| PostDetail {
                summary: PostSummary {
                    liked_by_viewer: viewer.is_some_and(|v| p.likes.contains(&v)),
                    ..p.summary.clone()
                },
                body: p.body.clone(),
            }))
    }

    async fn like(&self, post_id: Uuid, viewer_id: Uuid) -> Result<u64, ApiError> {
        self.enter(Operation::Like).await?;
        self.set_like(post_id, viewer_id, true).await
    }

    async fn unlike(&self, post_id: Uuid, viewer_id: Uuid) -> Result<u64, ApiError> {
        self.enter(Operation::Unlike).await?;
        self.set_like(post_id, viewer_id, false).await
    }

    async fn create(&self, post: NewPost) -> Result<Uuid, ApiError> {
        self.enter(Operation::CreatePost).await?;
        let mut tables = self.tables.write().await;

        let author = tables
            .profiles
            .values()
            .find(|p| p.id == post.author_id)
            .map(|p| AuthorSummary {
                name: p.name.clone(),
                username: p.username.clone(),
                photo_url: p.photo_url.clone(),
            })
            .ok_or(ApiError::NotFound)?;

        let id = Uuid::new_v4();
        tables.posts.insert(
            0,
            StoredPost {
                summary: PostSummary {
                    id,
                    title: post.title,
                    thumbnail: Self::image_url(&post.thumbnail),
                    category: post.category,
                    other_category: post.other_category,
                    author,
                    created_at: Utc::now(),
                    like_count: 0,
                    liked_by_viewer: false,
                },
                body: post.body,
                likes: HashSet::new(),
            },
        );

        tracing::debug!(post_id = %id, "Post created");
        Ok(id)
    }

    async fn delete(&self, post_id: Uuid) -> Result<(), ApiError> {
        self.enter(Operation::DeletePost).await?;
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.summary.id != post_id);
        if tables.posts.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
