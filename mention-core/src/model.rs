//! Mention records and their content-addressed keys
//!
//! Three record kinds are persisted:
//! - `Mention`: a claimed source -> target link, keyed by a hash of both URLs
//! - `SentRecord`: the last time a source's outbound mentions were sent
//! - `Thumbnail`: an encoded author photo, keyed by a hash of its bytes

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::{MentionError, SENT_SLACK_SECS};

/// Triage state of a received mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MentionState {
    /// Passed fast validation, waiting for the sweep or an operator
    #[default]
    Untriaged,
    /// Verified to link to the target (or approved by an operator)
    Good,
    /// Failed verification (or rejected by an operator)
    Spam,
}

impl MentionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentionState::Untriaged => "untriaged",
            MentionState::Good => "good",
            MentionState::Spam => "spam",
        }
    }
}

impl fmt::Display for MentionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MentionState {
    type Err = MentionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "untriaged" => Ok(MentionState::Untriaged),
            "good" => Ok(MentionState::Good),
            "spam" => Ok(MentionState::Spam),
            other => Err(MentionError::Parse(format!("unknown mention state: {other:?}"))),
        }
    }
}

/// A claim that `source` links to `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub source: String,
    pub target: String,
    pub state: MentionState,
    /// When the mention was received
    pub received_at: DateTime<Utc>,

    // Metadata found during slow validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_id: Option<String>,
}

impl Mention {
    /// Create an untriaged mention received now
    pub fn new(source: &str, target: &str) -> Self {
        Self::received_at(source, target, Utc::now())
    }

    pub fn received_at(source: &str, target: &str, received_at: DateTime<Utc>) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            state: MentionState::Untriaged,
            received_at,
            title: None,
            author: None,
            author_url: None,
            published_at: None,
            thumbnail_id: None,
        }
    }

    pub fn with_state(mut self, state: MentionState) -> Self {
        self.state = state;
        self
    }

    /// Storage key, identical for every delivery of the same pair
    pub fn key(&self) -> String {
        mention_key(&self.source, &self.target)
    }
}

/// A mention paired with its storage key, for triage listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionWithKey {
    pub key: String,
    #[serde(flatten)]
    pub mention: Mention,
}

/// Key of the mention for a (source, target) pair
pub fn mention_key(source: &str, target: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(target.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hex SHA-256 of a byte slice
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Record of the last outbound notification run for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentRecord {
    pub last_notified_at: DateTime<Utc>,
}

impl SentRecord {
    pub fn new(last_notified_at: DateTime<Utc>) -> Self {
        Self { last_notified_at }
    }

    /// Whether a source updated at `updated_at` was already notified
    pub fn covers(&self, updated_at: DateTime<Utc>) -> bool {
        self.last_notified_at >= updated_at - Duration::seconds(SENT_SLACK_SECS)
    }
}

/// An encoded author photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub image_bytes: Vec<u8>,
}

impl Thumbnail {
    pub fn new(image_bytes: Vec<u8>) -> Self {
        Self { image_bytes }
    }

    /// Content address of the encoded bytes
    pub fn id(&self) -> String {
        content_hash(&self.image_bytes)
    }
}

/// A feed entry and the links found in its content. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionSource {
    pub source: String,
    /// Discovery order, duplicates kept
    pub targets: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mention_key_is_stable() {
        let a = Mention::new("https://a.example/post", "https://bitworking.org/x");
        let b = Mention::new("https://a.example/post", "https://bitworking.org/x");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().len(), 64);
    }

    #[test]
    fn test_mention_key_differs_by_pair() {
        assert_ne!(
            mention_key("https://a.example/1", "https://bitworking.org/x"),
            mention_key("https://a.example/2", "https://bitworking.org/x")
        );
    }

    #[test]
    fn test_state_parse_and_display() {
        assert_eq!("good".parse::<MentionState>().unwrap(), MentionState::Good);
        assert_eq!(" Spam ".parse::<MentionState>().unwrap(), MentionState::Spam);
        assert_eq!(MentionState::Untriaged.to_string(), "untriaged");
        assert!("maybe".parse::<MentionState>().is_err());
    }

    #[test]
    fn test_sent_record_covers() {
        let sent = SentRecord::new(Utc.with_ymd_and_hms(2016, 8, 16, 12, 0, 0).unwrap());

        assert!(sent.covers(Utc.with_ymd_and_hms(2016, 8, 16, 11, 0, 0).unwrap()));
        assert!(sent.covers(Utc.with_ymd_and_hms(2016, 8, 16, 12, 0, 1).unwrap()));
        assert!(!sent.covers(Utc.with_ymd_and_hms(2016, 8, 16, 12, 0, 2).unwrap()));
    }

    #[test]
    fn test_thumbnail_id_is_content_hash() {
        let a = Thumbnail::new(vec![1, 2, 3]);
        let b = Thumbnail::new(vec![1, 2, 3]);
        let c = Thumbnail::new(vec![3, 2, 1]);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }
}
