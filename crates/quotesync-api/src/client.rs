use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Mock backend the quote page has always synced against
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Endpoint not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// A post as the remote source serves it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub user_id: Option<u64>,
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Payload for creating a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

pub struct QuoteApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl QuoteApiClient {
    /// Point the client somewhere else (self-hosted mock, tests)
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("QuoteSync/0.1.0"),
        );

        // Timeout bounds a hung fetch to one sync cycle
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch every post from the remote source
    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let url = format!("{}/posts", self.base_url);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;

        if response.status() == 404 {
            return Err(ApiError::NotFound(url));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RequestFailed(format!(
                "Status {}: {}",
                status, body
            )));
        }

        // Read as text first so a bad payload surfaces as ParseError, not NetworkError
        let text = response.text().await?;
        let posts: Vec<Post> = serde_json::from_str(&text)?;
        Ok(posts)
    }

    /// Create a post; the mock backend echoes it back with an id
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let url = format!("{}/posts", self.base_url);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(post).send().await?;

        if response.status() == 404 {
            return Err(ApiError::NotFound(url));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RequestFailed(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let text = response.text().await?;
        let created: Post = serde_json::from_str(&text)?;
        Ok(created)
    }
}
