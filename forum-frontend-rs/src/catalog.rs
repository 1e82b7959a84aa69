//! Stateless gateway to the remote forum catalog.
//!
//! Request/response translation only: no retries, no caching, no input
//! validation. Bodies are read as text and decoded with `serde_json`, so a
//! malformed body surfaces as a decode error rather than being folded into
//! the transport error.

use forum_types::{Comment, NewPost, Post, PostId, User, UserId};
use serde::de::DeserializeOwned;

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("request to the catalog failed: {0:?}")]
    Transport(#[source] fetch_happen::Error),

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("catalog returned status {status}")]
    Status { status: u16 },

    #[error("failed to decode {resource}: {source}")]
    Decode {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Catalog {
    base_url: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the gateway at a different host (tests, self-hosted mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &'static str,
    ) -> Result<T, CatalogError> {
        let client = fetch_happen::Client;
        let response = client
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(CatalogError::Transport)?;
        decode(response, resource).await
    }

    pub async fn users(&self) -> Result<Vec<User>, CatalogError> {
        self.get_json("/users", "users").await
    }

    pub async fn user(&self, id: UserId) -> Result<User, CatalogError> {
        self.get_json(&format!("/users/{id}"), "user").await
    }

    pub async fn posts(&self) -> Result<Vec<Post>, CatalogError> {
        self.get_json("/posts", "posts").await
    }

    pub async fn post(&self, id: PostId) -> Result<Post, CatalogError> {
        self.get_json(&format!("/posts/{id}"), "post").await
    }

    /// Posts authored by `user_id`, filtered server-side.
    pub async fn posts_by_user(&self, user_id: UserId) -> Result<Vec<Post>, CatalogError> {
        self.get_json(&format!("/posts?userId={user_id}"), "posts")
            .await
    }

    pub async fn comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>, CatalogError> {
        self.get_json(&format!("/posts/{post_id}/comments"), "comments")
            .await
    }

    /// The demo catalog echoes the created post back but does not keep it;
    /// the caller's own state stays the source of truth for authored content.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, CatalogError> {
        let client = fetch_happen::Client;
        let response = client
            .post(self.endpoint("/posts"))
            .header("Content-Type", "application/json; charset=UTF-8")
            .json(post)
            .map_err(CatalogError::Transport)?
            .send()
            .await
            .map_err(CatalogError::Transport)?;
        decode(response, "created post").await
    }

    /// Fire-and-forget; the demo catalog accepts the DELETE without effect.
    pub async fn delete_post(&self, id: PostId) -> Result<(), CatalogError> {
        let client = fetch_happen::Client;
        let response = client
            .delete(self.endpoint(&format!("/posts/{id}")))
            .send()
            .await
            .map_err(CatalogError::Transport)?;
        if !response.ok() {
            return Err(CatalogError::Status {
                status: response.status(),
            });
        }
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(
    response: fetch_happen::Response,
    resource: &'static str,
) -> Result<T, CatalogError> {
    if response.status() == 404 {
        return Err(CatalogError::NotFound { resource });
    }
    if !response.ok() {
        return Err(CatalogError::Status {
            status: response.status(),
        });
    }
    let body = response.text().await.map_err(CatalogError::Transport)?;
    serde_json::from_str(&body).map_err(|source| CatalogError::Decode { resource, source })
}
