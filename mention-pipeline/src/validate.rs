//! Inbound mention validation
//!
//! - **Fast**: structural checks on the claimed pair, no I/O. Runs on every
//!   delivery before anything is stored.
//! - **Slow**: fetches the source and confirms it links to the target, then
//!   enriches the mention from the same body.

use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::Extractor;
use mention_core::{Config, Mention, MentionError, ValidationError};
use mention_net::{links_to, Fetcher};

/// Which targets this site accepts mentions for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPolicy {
    pub allowed_host: String,
    pub required_scheme: String,
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self {
            allowed_host: mention_core::DEFAULT_ALLOWED_HOST.to_string(),
            required_scheme: mention_core::DEFAULT_REQUIRED_SCHEME.to_string(),
        }
    }
}

impl From<&Config> for TargetPolicy {
    fn from(config: &Config) -> Self {
        Self {
            allowed_host: config.allowed_host.clone(),
            required_scheme: config.required_scheme.clone(),
        }
    }
}

/// Structural validation of a claimed source/target pair
pub fn fast_validate(source: &str, target: &str, policy: &TargetPolicy) -> Result<(), ValidationError> {
    if source.is_empty() {
        return Err(ValidationError::EmptySource);
    }
    if target.is_empty() {
        return Err(ValidationError::EmptyTarget);
    }
    if source == target {
        return Err(ValidationError::SameSourceTarget);
    }

    let url = Url::parse(target).map_err(|e| ValidationError::InvalidTarget(e.to_string()))?;

    let host = url.host_str().unwrap_or_default();
    if host != policy.allowed_host {
        return Err(ValidationError::WrongHost {
            expected: policy.allowed_host.clone(),
            actual: host.to_string(),
        });
    }

    if url.scheme() != policy.required_scheme {
        return Err(ValidationError::WrongScheme {
            expected: policy.required_scheme.clone(),
            actual: url.scheme().to_string(),
        });
    }

    Ok(())
}

/// Semantic validation: the source must really link to the target
pub struct SlowValidator {
    fetcher: Arc<dyn Fetcher>,
    extractor: Extractor,
}

impl SlowValidator {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Extractor) -> Self {
        Self { fetcher, extractor }
    }

    /// Confirm `mention.source` links to `mention.target`, enriching on success
    pub async fn validate(&self, mention: &mut Mention) -> Result<(), MentionError> {
        debug!("Slow validating: {}", mention.source);

        let bytes = self.fetcher.fetch(&mention.source).await?;
        let body = String::from_utf8_lossy(&bytes);

        if !links_to(&body, &mention.source, &mention.target) {
            return Err(ValidationError::TargetNotLinked {
                source_url: mention.source.clone(),
                target: mention.target.clone(),
            }
            .into());
        }

        self.extractor.extract(mention, &body).await;
        Ok(())
    }
}
