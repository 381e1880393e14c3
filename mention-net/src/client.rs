//! HTTP client construction
//!
//! Every outbound call (endpoint discovery, delivery, source and photo fetch)
//! goes through a client built here, so all of them share one timeout.

use mention_core::{HttpConfig, MentionError};
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Errors from outbound HTTP
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl NetError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetError::Request(e) if e.is_timeout())
    }
}

impl From<NetError> for MentionError {
    fn from(err: NetError) -> Self {
        MentionError::Fetch(err.to_string())
    }
}

/// Create an HTTP client honouring the configured timeout and user agent
pub fn create_client(config: &HttpConfig) -> Result<Client, NetError> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| NetError::ClientBuild(e.to_string()))
}
