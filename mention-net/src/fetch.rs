//! Fetch capability
//!
//! Source re-fetch and author photo fetch both go through `Fetcher`, so tests
//! can substitute canned responses.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::{create_client, NetError};
use mention_core::HttpConfig;

/// Retrieves the bytes behind a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetError>;
}

/// `Fetcher` backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetError> {
        debug!("Fetching: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            warn!("Fetch of {} returned status: {}", url, response.status());
            return Err(NetError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// `Fetcher` serving fixed bodies, for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetError> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| NetError::InvalidUrl(format!("no canned body for {url}")))
    }
}
