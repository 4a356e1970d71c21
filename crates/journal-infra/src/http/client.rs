use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use journal_core::domain::{
    Cursor, ExternalIdentity, FeedPage, FeedQuery, ImageSource, NewPost, NewProfile, PostDetail,
    Profile,
};
use journal_core::error::ApiError;
use journal_core::ports::{FeedSource, IdentityProvider, PostApi, ProfileApi};
use journal_shared::dto::{
    CheckUsernameRequest, CheckUsernameResponse, CreatePostResponse, CreateUserPayload,
    DeletePostRequest, ErrorBody, FeedPageRequest, FeedPageResponse, GetPostRequest,
    GetPostResponse, GetUserRequest, LikeRequest, LikeResponse, SendVerificationRequest,
    UserResponse,
};

use super::convert::{detail_from_dto, page_from_dto, profile_from_dto};

/// HTTP backend configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the journal API, without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("JOURNAL_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: std::env::var("JOURNAL_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// Journal REST API client implementing every port.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: HttpConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read(path, response).await
    }

    async fn post_form<Resp>(&self, path: &str, form: Form) -> Result<Resp, ApiError>
    where
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read(path, response).await
    }

    /// Map status codes onto `ApiError` and decode the body.
    async fn read<Resp>(path: &str, response: Response) -> Result<Resp, ApiError>
    where
        Resp: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<Resp>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()));
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());

        tracing::debug!(path, status = status.as_u16(), %message, "Backend call rejected");

        Err(match status {
            StatusCode::NOT_FOUND => ApiError::NotFound,
            StatusCode::CONFLICT => ApiError::Conflict(message),
            _ => ApiError::Server {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn file_part(image: &ImageSource) -> Result<Option<Part>, ApiError> {
        match image {
            ImageSource::Url(_) => Ok(None),
            ImageSource::File(file) => Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(file.content_type())
                .map(Some)
                .map_err(|e| ApiError::Network(e.to_string())),
        }
    }

    fn encode<T: Serialize>(value: &T) -> Result<String, ApiError> {
        serde_json::to_string(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for HttpBackend {
    async fn send_verification_email(&self, identity: &ExternalIdentity) -> Result<(), ApiError> {
        let request = SendVerificationRequest {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
        };
        self.post_json::<_, serde_json::Value>("/auth/send-verification", &request)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ProfileApi for HttpBackend {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Profile>, ApiError> {
        let request = GetUserRequest {
            uid: external_id.to_string(),
        };
        match self
            .post_json::<_, UserResponse>("/auth/get-user", &request)
            .await
        {
            Ok(response) => Ok(response.user.map(profile_from_dto)),
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn username_exists(&self, username: &str) -> Result<bool, ApiError> {
        let request = CheckUsernameRequest {
            username: username.to_string(),
        };
        let response: CheckUsernameResponse =
            self.post_json("/auth/checkUsername", &request).await?;
        Ok(response.exists)
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, ApiError> {
        let payload = CreateUserPayload {
            uid: profile.external_id,
            username: profile.username,
            name: profile.name,
            bio: profile.bio,
            image: profile
                .image
                .as_ref()
                .and_then(ImageSource::as_url)
                .map(str::to_string),
        };

        let mut form = Form::new().text("user", Self::encode(&payload)?);
        if let Some(part) = profile.image.as_ref().map(Self::file_part).transpose()?.flatten() {
            form = form.part("file", part);
        }

        let response: UserResponse = self.post_form("/auth/create-user", form).await?;
        response
            .user
            .map(profile_from_dto)
            .ok_or_else(|| ApiError::Decode("create-user returned no user".into()))
    }
}

#[async_trait]
impl FeedSource for HttpBackend {
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&Cursor>,
        viewer: Option<Uuid>,
    ) -> Result<FeedPage, ApiError> {
        // The backend multiplies the page number out, so the first page is 0.
        let page = Some(
            cursor
                .map(|c| c.as_value().clone())
                .unwrap_or_else(|| serde_json::json!(0)),
        );
        let (path, request) = match query {
            FeedQuery::Home => (
                "/post/get-recent-posts",
                FeedPageRequest {
                    page,
                    username: None,
                    user_id: viewer,
                },
            ),
            FeedQuery::User { username } => (
                "/post/get-user-posts",
                FeedPageRequest {
                    page,
                    username: Some(username.clone()),
                    user_id: viewer,
                },
            ),
        };

        let response: FeedPageResponse = self.post_json(path, &request).await?;
        page_from_dto(response, viewer)
    }
}

#[async_trait]
impl PostApi for HttpBackend {
    async fn get_post(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<PostDetail>, ApiError> {
        let request = GetPostRequest { post_id };
        match self
            .post_json::<_, GetPostResponse>("/post/get-post", &request)
            .await
        {
            Ok(response) => response
                .post
                .map(|post| detail_from_dto(post, viewer))
                .transpose(),
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn like(&self, post_id: Uuid, viewer_id: Uuid) -> Result<u64, ApiError> {
        let request = LikeRequest {
            post_id,
            user_id: viewer_id,
        };
        let response: LikeResponse = self.post_json("/post/likePost", &request).await?;
        Ok(response.like_count)
    }

    async fn unlike(&self, post_id: Uuid, viewer_id: Uuid) -> Result<u64, ApiError> {
        let request = LikeRequest {
            post_id,
            user_id: viewer_id,
        };
        let response: LikeResponse = self.post_json("/post/unlikePost", &request).await?;
        Ok(response.like_count)
    }

    async fn create(&self, post: NewPost) -> Result<Uuid, ApiError> {
        let author = serde_json::json!({ "id": post.author_id });
        let mut form = Form::new()
            .text("title", post.title)
            .text("category", post.category.as_str())
            .text("otherCategory", post.other_category.unwrap_or_default())
            .text("content", post.body)
            .text("user", Self::encode(&author)?);

        form = match Self::file_part(&post.thumbnail)? {
            Some(part) => form.part("file", part),
            None => form.text(
                "thumbnailUrl",
                post.thumbnail.as_url().unwrap_or_default().to_string(),
            ),
        };

        let response: CreatePostResponse = self.post_form("/post/create-post", form).await?;
        Ok(response.id)
    }

    async fn delete(&self, post_id: Uuid) -> Result<(), ApiError> {
        let request = DeletePostRequest { post_id };
        self.post_json::<_, serde_json::Value>("/post/delete-post", &request)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(HttpConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn user_json() -> serde_json::Value {
        json!({
            "id": "6f1f5d4e-8c4b-4c65-9b4e-6a1a2b3c4d5e",
            "uid": "firebase-uid",
            "username": "alice",
            "name": "Alice",
            "bio": null,
            "photoURL": "https://img.example/a.png",
            "createdAt": "2025-01-13T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_find_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/get-user"))
            .and(body_json(json!({ "uid": "firebase-uid" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user_json() })))
            .mount(&server)
            .await;

        let profile = backend(&server)
            .await
            .find_by_external_id("firebase-uid")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(profile.username, "alice");
        assert_eq!(profile.external_id, "firebase-uid");
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/get-user"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let found = backend(&server).await.find_by_external_id("nobody").await;
        assert_eq!(found, Ok(None));
    }

    #[tokio::test]
    async fn test_username_check() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/checkUsername"))
            .and(body_json(json!({ "username": "abc" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": true })))
            .mount(&server)
            .await;

        assert_eq!(backend(&server).await.username_exists("abc").await, Ok(true));
    }

    #[tokio::test]
    async fn test_create_conflict_maps_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/create-user"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({ "message": "username taken" })),
            )
            .mount(&server)
            .await;

        let result = backend(&server)
            .await
            .create_profile(NewProfile {
                external_id: "firebase-uid".into(),
                username: "alice".into(),
                name: "Alice".into(),
                bio: None,
                image: Some(ImageSource::Url("https://img.example/a.png".into())),
            })
            .await;

        assert_eq!(result, Err(ApiError::Conflict("username taken".into())));
    }

    #[tokio::test]
    async fn test_feed_page_sends_cursor_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/post/get-recent-posts"))
            .and(body_json(json!({ "page": 3 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "posts": [], "nextPage": 4 })),
            )
            .mount(&server)
            .await;

        let cursor = Cursor::from_value(json!(3));
        let page = backend(&server)
            .await
            .fetch_page(&FeedQuery::Home, Some(&cursor), None)
            .await
            .unwrap();

        assert_eq!(page.next_cursor, Some(Cursor::from_value(json!(4))));
    }

    #[tokio::test]
    async fn test_first_page_is_page_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/post/get-user-posts"))
            .and(body_json(json!({ "page": 0, "username": "alice" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "posts": [], "nextPage": null })),
            )
            .mount(&server)
            .await;

        let page = backend(&server)
            .await
            .fetch_page(
                &FeedQuery::User {
                    username: "alice".into(),
                },
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(page, FeedPage::default());
    }

    #[tokio::test]
    async fn test_get_post_reads_body_and_likes() {
        let server = MockServer::start().await;
        let post_id = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/post/get-post"))
            .and(body_json(json!({ "postId": post_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "post": {
                    "id": post_id,
                    "title": "Hello",
                    "thumbnail": "https://img.example/t.png",
                    "category": "OTHER",
                    "otherCategory": "home brewing",
                    "User": { "name": "Bob", "username": "bob", "photoURL": null },
                    "createdAt": "2025-01-13T10:00:00Z",
                    "likes": [viewer],
                    "content": "<p>body</p>"
                }
            })))
            .mount(&server)
            .await;

        let detail = backend(&server)
            .await
            .get_post(post_id, Some(viewer))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(detail.body, "<p>body</p>");
        assert_eq!(detail.summary.category_label(), "home brewing");
        assert_eq!(detail.summary.like_count, 1);
        assert!(detail.summary.liked_by_viewer);
    }

    #[tokio::test]
    async fn test_missing_post_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/post/get-post"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "post": null })))
            .mount(&server)
            .await;

        let found = backend(&server).await.get_post(Uuid::new_v4(), None).await;
        assert_eq!(found, Ok(None));
    }

    #[tokio::test]
    async fn test_like_returns_server_count() {
        let server = MockServer::start().await;
        let (post_id, viewer_id) = (Uuid::new_v4(), Uuid::new_v4());
        Mock::given(method("POST"))
            .and(path("/post/likePost"))
            .and(body_json(json!({ "postId": post_id, "userId": viewer_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "likeCount": 12 })))
            .mount(&server)
            .await;

        assert_eq!(backend(&server).await.like(post_id, viewer_id).await, Ok(12));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/post/unlikePost"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = backend(&server)
            .await
            .unlike(Uuid::new_v4(), Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(ApiError::Server { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let backend = HttpBackend::new(HttpConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let result = backend.delete(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ApiError::Network(_))));
    }
}
