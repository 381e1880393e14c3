//! Mention Runtime
//!
//! Wires the pipeline stages to a store and the network:
//! - **Mentions**: the triage state machine and the inbound contract
//! - **Sweeper**: batch slow validation of queued mentions
//! - **FeedJob**: batch outbound dispatch from a feed

pub mod feed_job;
pub mod mentions;
pub mod sweep;

#[cfg(test)]
mod testing;

pub use feed_job::*;
pub use mentions::*;
pub use sweep::*;

use std::sync::Arc;
use tracing::debug;

use mention_core::{Config, MentionError, Store};
use mention_net::{Fetcher, HttpFetcher, HttpNotifier, Notifier};
use mention_pipeline::{Dispatcher, Extractor, SlowValidator, TargetPolicy, ThumbnailService};

/// Every service, sharing one store
pub struct Runtime {
    pub mentions: Mentions,
    pub sweeper: Sweeper,
    pub feeds: FeedJob,
}

impl Runtime {
    /// Build with HTTP capabilities from `config`
    pub fn new(config: &Config, store: Arc<dyn Store>) -> Result<Self, MentionError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
        let notifier = Arc::new(HttpNotifier::new(&config.http)?);
        Ok(Self::with_capabilities(config, store, fetcher, notifier))
    }

    /// Build with caller-supplied fetch and notify capabilities
    pub fn with_capabilities(
        config: &Config,
        store: Arc<dyn Store>,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        debug!(
            "Accepting mentions for {}://{}",
            config.required_scheme, config.allowed_host
        );

        let mentions = Mentions::new(store.clone(), TargetPolicy::from(config));

        let thumbnails = ThumbnailService::new(store.clone(), fetcher.clone(), config.thumbnail.size);
        let validator = SlowValidator::new(fetcher, Extractor::new(thumbnails));
        let sweeper = Sweeper::new(mentions.clone(), validator);

        let feeds = FeedJob::new(Dispatcher::new(store, notifier));

        Self {
            mentions,
            sweeper,
            feeds,
        }
    }
}
