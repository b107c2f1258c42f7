//! Blog comments, kept in a hosted PostgREST (Supabase) table
//!
//! The table is `comments(id, post_slug, nickname, content, created_at)`; rows
//! are read newest first and inserted one at a time. Consistency and ordering
//! are the backend's business.

use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

const COMMENTS_TABLE_PATH: &str = "/rest/v1/comments";
pub const MIN_CONTENT_CHARS: usize = 10;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("nickname must not be empty")]
    EmptyNickname,
    #[error("comment must be at least {} characters", MIN_CONTENT_CHARS)]
    ContentTooShort,
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("comment backend returned {status}: {message}")]
    Backend { status: StatusCode, message: String },
    #[error("Invalid URL format: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Comment {
    /// Backend-assigned, opaque
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub post_slug: String,
    pub nickname: String,
    pub content: String,
    pub created_at: String,
}

/// Accept either a string or a numeric primary key
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

/// A validated comment ready to insert
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewComment {
    post_slug: String,
    nickname: String,
    content: String,
}

impl NewComment {
    pub fn new(post_slug: &str, nickname: &str, content: &str) -> Result<Self, CommentError> {
        let nickname = nickname.trim();
        let content = content.trim();
        if nickname.is_empty() {
            return Err(CommentError::EmptyNickname);
        }
        if content.chars().count() < MIN_CONTENT_CHARS {
            return Err(CommentError::ContentTooShort);
        }
        Ok(Self {
            post_slug: post_slug.to_string(),
            nickname: nickname.to_string(),
            content: content.to_string(),
        })
    }

    pub fn post_slug(&self) -> &str {
        &self.post_slug
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[async_trait::async_trait]
pub trait CommentStore: Send + Sync {
    /// All comments on a post, newest first
    async fn fetch(&self, post_slug: &str) -> Result<Vec<Comment>, CommentError>;

    async fn insert(&self, comment: &NewComment) -> Result<(), CommentError>;
}

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: Url,
    /// Public anon key, sent as both `apikey` and bearer token
    pub anon_key: String,
}

pub struct SupabaseCommentStore {
    table_url: Url,
    anon_key: String,
    http_client: Client,
}

impl SupabaseCommentStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, CommentError> {
        Ok(Self {
            table_url: config.url.join(COMMENTS_TABLE_PATH)?,
            anon_key: config.anon_key,
            http_client: Client::builder().build()?,
        })
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CommentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                error!(error = ?err, "Failed to read comment backend error body");
                format!("failed to read response body: {}", err)
            }
        };
        error!(status = %status, message = %message, "Comment backend request failed");
        Err(CommentError::Backend { status, message })
    }
}

#[async_trait::async_trait]
impl CommentStore for SupabaseCommentStore {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, post_slug: &str) -> Result<Vec<Comment>, CommentError> {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("post_slug", &format!("eq.{post_slug}"))
            .append_pair("order", "created_at.desc");

        let response = self
            .request(reqwest::Method::GET, url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let comments: Vec<Comment> = Self::check(response).await?.json().await?;
        debug!(count = comments.len(), "Fetched comments");
        Ok(comments)
    }

    #[instrument(level = "debug", skip_all, fields(post_slug = %comment.post_slug()))]
    async fn insert(&self, comment: &NewComment) -> Result<(), CommentError> {
        let response = self
            .request(reqwest::Method::POST, self.table_url.clone())
            .header("Prefer", "return=minimal")
            .json(&[comment])
            .send()
            .await?;
        Self::check(response).await?;
        debug!("Inserted comment");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::logging::setup_test_logging;

    fn store_for(server: &MockServer) -> SupabaseCommentStore {
        SupabaseCommentStore::new(SupabaseConfig {
            url: Url::parse(&server.uri()).expect("Failed to parse mock server uri"),
            anon_key: "anon-key".to_string(),
        })
        .expect("Failed to build comment store")
    }

    #[test]
    fn test_new_comment_trims() {
        let comment = NewComment::new("first-post", "  はなこ ", "  とても素敵な記事でした！  ")
            .expect("Comment should be valid");
        assert_eq!(comment.nickname(), "はなこ");
        assert_eq!(comment.content(), "とても素敵な記事でした！");
        assert_eq!(comment.post_slug(), "first-post");
    }

    #[test]
    fn test_new_comment_rejects_blank_nickname() {
        let result = NewComment::new("first-post", "   ", "long enough content here");
        assert!(matches!(result, Err(CommentError::EmptyNickname)));
    }

    #[test]
    fn test_new_comment_rejects_short_content() {
        let result = NewComment::new("first-post", "taro", "  short  ");
        assert!(matches!(result, Err(CommentError::ContentTooShort)));
    }

    #[test]
    fn test_new_comment_counts_characters_not_bytes() {
        // nine characters, 27 bytes
        let result = NewComment::new("first-post", "taro", "あいうえおかきくけ");
        assert!(matches!(result, Err(CommentError::ContentTooShort)));

        let result = NewComment::new("first-post", "taro", "あいうえおかきくけこ");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_comments() {
        setup_test_logging();
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/comments"))
            .and(query_param("select", "*"))
            .and(query_param("post_slug", "eq.first-post"))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "6f2c1f0e-2a7e-4c55-9d0e-1c3f5b1d2a10",
                    "post_slug": "first-post",
                    "nickname": "hanako",
                    "content": "newest comment here",
                    "created_at": "2026-01-02T10:00:00+00:00"
                },
                {
                    "id": 7,
                    "post_slug": "first-post",
                    "nickname": "taro",
                    "content": "older comment here",
                    "created_at": "2026-01-01T10:00:00+00:00"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server);
        let comments = store.fetch("first-post").await.expect("Failed to fetch");

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].nickname, "hanako");
        assert_eq!(comments[1].id, "7");
    }

    #[tokio::test]
    async fn test_insert_comment() {
        setup_test_logging();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/comments"))
            .and(header("prefer", "return=minimal"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!([{
                "post_slug": "first-post",
                "nickname": "taro",
                "content": "a thoughtful comment"
            }])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server);
        let comment = NewComment::new("first-post", " taro ", "a thoughtful comment ")
            .expect("Comment should be valid");
        store.insert(&comment).await.expect("Failed to insert");
    }

    #[tokio::test]
    async fn test_backend_error() {
        setup_test_logging();
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/comments"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"message":"Invalid API key"}"#),
            )
            .mount(&server)
            .await;

        let store: Box<dyn CommentStore> = Box::new(store_for(&server));
        match store.fetch("first-post").await {
            Err(CommentError::Backend { status, message }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert!(message.contains("Invalid API key"));
            }
            other => panic!("Expected a backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_error_with_truncated_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        setup_test_logging();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");

        // promise 100 bytes of body, send 7, hang up
        let backend = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("Failed to accept");
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial",
                )
                .await
                .expect("Failed to write response");
        });

        let store = SupabaseCommentStore::new(SupabaseConfig {
            url: Url::parse(&format!("http://{}", addr)).expect("Failed to parse url"),
            anon_key: "anon-key".to_string(),
        })
        .expect("Failed to build comment store");

        match store.fetch("first-post").await {
            Err(CommentError::Backend { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(
                    message.starts_with("failed to read response body"),
                    "unexpected message {}",
                    message
                );
            }
            other => panic!("Expected a backend error, got {:?}", other),
        }
        backend.await.expect("Backend task panicked");
    }
}
