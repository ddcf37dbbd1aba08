// HTTP client for the remote quote source
pub mod client;

// Re-export common types
pub use client::{ApiError, NewPost, Post, QuoteApiClient, DEFAULT_BASE_URL};
