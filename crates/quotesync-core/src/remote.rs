// Remote quote source - bridges the API client with the RemoteFetcher trait
use async_trait::async_trait;
use quotesync_api::{NewPost, Post, QuoteApiClient};
use std::time::Duration;
use tracing::debug;

use crate::{models::Quote, Error, Result};

/// Category given to quotes pulled from the server when none is configured
pub const DEFAULT_REMOTE_CATEGORY: &str = "Server";

/// Where remote quotes come from
///
/// The sync service only knows this trait, so tests swap in a mock and
/// nothing touches the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetch the current remote batch, already mapped into quotes
    async fn fetch_quotes(&self) -> Result<Vec<Quote>>;

    /// Push a local quote to the server; returns the id it was assigned
    async fn publish(&self, quote: &Quote) -> Result<Option<u64>>;
}

/// HTTP-backed fetcher talking to the posts endpoint
pub struct HttpRemoteFetcher {
    client: QuoteApiClient,
    category: String,
}

impl HttpRemoteFetcher {
    pub fn new(base_url: &str, timeout: Duration, category: impl Into<String>) -> Result<Self> {
        let client = QuoteApiClient::with_base_url(base_url, timeout)
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            category: category.into(),
        })
    }
}

#[async_trait]
impl RemoteFetcher for HttpRemoteFetcher {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>> {
        let posts = self
            .client
            .fetch_posts()
            .await
            .map_err(|e| Error::RemoteFetch(e.to_string()))?;

        let quotes = posts_to_quotes(posts, &self.category);
        debug!("Fetched {} quotes from {}", quotes.len(), self.client.base_url());
        Ok(quotes)
    }

    async fn publish(&self, quote: &Quote) -> Result<Option<u64>> {
        let post = NewPost {
            title: quote.text.clone(),
            body: quote.category.clone(),
            user_id: None,
        };

        let created = self
            .client
            .create_post(&post)
            .await
            .map_err(|e| Error::RemotePublish(e.to_string()))?;

        Ok(Some(created.id))
    }
}

/// Convert server posts into quotes. The title becomes the text; posts
/// with a blank title are dropped.
pub fn posts_to_quotes(posts: Vec<Post>, category: &str) -> Vec<Quote> {
    posts
        .into_iter()
        .filter_map(|post| {
            let text = post.title.trim();
            if text.is_empty() {
                None
            } else {
                Some(Quote::remote(post.id, text, category))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: u64, title: &str) -> Post {
        Post {
            user_id: Some(1),
            id,
            title: title.to_string(),
            body: "ignored".to_string(),
        }
    }

    #[test]
    fn test_posts_to_quotes() {
        let quotes = posts_to_quotes(vec![post(1, " sunt aut facere "), post(2, "qui est esse")], "Server");
        assert_eq!(
            quotes,
            vec![
                Quote::remote(1, "sunt aut facere", "Server"),
                Quote::remote(2, "qui est esse", "Server"),
            ]
        );
    }

    #[test]
    fn test_blank_titles_dropped() {
        let quotes = posts_to_quotes(vec![post(1, "   "), post(2, "kept")], "Server");
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].id, Some(2));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_fetch_error() {
        // Nothing listens on the discard port
        let fetcher =
            HttpRemoteFetcher::new("http://127.0.0.1:9", Duration::from_secs(2), "Server").unwrap();

        let err = fetcher.fetch_quotes().await.unwrap_err();
        assert!(matches!(err, Error::RemoteFetch(_)));

        let err = fetcher.publish(&Quote::new("A", "x")).await.unwrap_err();
        assert!(matches!(err, Error::RemotePublish(_)));
    }
}
