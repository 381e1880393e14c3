//! Persistent store for mentions, sent records and thumbnails
//!
//! The `Store` trait is the only persistence seam. It is handed to every
//! component at construction time as an `Arc<dyn Store>`.
//!
//! `MemoryStore` keeps the three collections in concurrent maps and can
//! snapshot them to a JSON file between runs.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::{Mention, MentionState, MentionWithKey, SentRecord, StoreError, Thumbnail};

/// A record together with its write version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

/// Equality filters, ordering and pagination over mentions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MentionQuery {
    pub target: Option<String>,
    pub state: Option<MentionState>,
    /// Order by receipt time, newest first
    pub newest_first: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl MentionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn state(mut self, state: MentionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    fn matches(&self, mention: &Mention) -> bool {
        self.target.as_deref().map_or(true, |t| mention.target == t)
            && self.state.map_or(true, |s| mention.state == s)
    }
}

/// Key-value persistence with indexed queries and single-record transactions
pub trait Store: Send + Sync {
    fn get_mention(&self, key: &str) -> Result<Option<Versioned<Mention>>, StoreError>;

    /// Unconditional upsert
    fn put_mention(&self, key: &str, mention: &Mention) -> Result<(), StoreError>;

    /// Write `mention` only if the stored version is still `expected_version`.
    /// Returns the new version.
    fn commit_mention(
        &self,
        key: &str,
        expected_version: u64,
        mention: &Mention,
    ) -> Result<u64, StoreError>;

    fn query_mentions(&self, query: &MentionQuery) -> Result<Vec<MentionWithKey>, StoreError>;

    fn get_sent(&self, source: &str) -> Result<Option<SentRecord>, StoreError>;

    fn put_sent(&self, source: &str, record: SentRecord) -> Result<(), StoreError>;

    fn get_thumbnail(&self, id: &str) -> Result<Option<Thumbnail>, StoreError>;

    fn put_thumbnail(&self, id: &str, thumbnail: &Thumbnail) -> Result<(), StoreError>;
}

/// On-disk form of a `MemoryStore`
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    mentions: BTreeMap<String, Versioned<Mention>>,
    #[serde(default)]
    sent: BTreeMap<String, SentRecord>,
    #[serde(default)]
    thumbnails: BTreeMap<String, Thumbnail>,
}

/// In-memory store with optimistic per-record versioning
#[derive(Debug, Default)]
pub struct MemoryStore {
    mentions: DashMap<String, Versioned<Mention>>,
    sent: DashMap<String, SentRecord>,
    thumbnails: DashMap<String, Thumbnail>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot file; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!("No snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Snapshot(format!("reading {}: {e}", path.display())))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .map_err(|e| StoreError::Snapshot(format!("decoding {}: {e}", path.display())))?;

        debug!(
            "Loaded {} mentions, {} sent records, {} thumbnails",
            snapshot.mentions.len(),
            snapshot.sent.len(),
            snapshot.thumbnails.len()
        );

        Ok(Self {
            mentions: snapshot.mentions.into_iter().collect(),
            sent: snapshot.sent.into_iter().collect(),
            thumbnails: snapshot.thumbnails.into_iter().collect(),
        })
    }

    /// Write a snapshot file, replacing any previous one
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = Snapshot {
            mentions: self
                .mentions
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            sent: self.sent.iter().map(|e| (e.key().clone(), *e.value())).collect(),
            thumbnails: self
                .thumbnails
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        };

        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StoreError::Snapshot(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| StoreError::Snapshot(format!("writing {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| StoreError::Snapshot(format!("renaming to {}: {e}", path.display())))?;
        Ok(())
    }

    pub fn mention_count(&self) -> usize {
        self.mentions.len()
    }

    pub fn thumbnail_count(&self) -> usize {
        self.thumbnails.len()
    }
}

impl Store for MemoryStore {
    fn get_mention(&self, key: &str) -> Result<Option<Versioned<Mention>>, StoreError> {
        Ok(self.mentions.get(key).map(|e| e.value().clone()))
    }

    fn put_mention(&self, key: &str, mention: &Mention) -> Result<(), StoreError> {
        self.mentions
            .entry(key.to_string())
            .and_modify(|v| {
                v.version += 1;
                v.record = mention.clone();
            })
            .or_insert_with(|| Versioned {
                version: 1,
                record: mention.clone(),
            });
        Ok(())
    }

    fn commit_mention(
        &self,
        key: &str,
        expected_version: u64,
        mention: &Mention,
    ) -> Result<u64, StoreError> {
        let mut entry = self
            .mentions
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if entry.version != expected_version {
            return Err(StoreError::Conflict(key.to_string()));
        }

        entry.version += 1;
        entry.record = mention.clone();
        Ok(entry.version)
    }

    fn query_mentions(&self, query: &MentionQuery) -> Result<Vec<MentionWithKey>, StoreError> {
        let mut found: Vec<MentionWithKey> = self
            .mentions
            .iter()
            .filter(|e| query.matches(&e.value().record))
            .map(|e| MentionWithKey {
                key: e.key().clone(),
                mention: e.value().record.clone(),
            })
            .collect();

        if query.newest_first {
            found.sort_by(|a, b| {
                b.mention
                    .received_at
                    .cmp(&a.mention.received_at)
                    .then_with(|| a.key.cmp(&b.key))
            });
        } else {
            found.sort_by(|a, b| a.key.cmp(&b.key));
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(found.into_iter().skip(query.offset).take(limit).collect())
    }

    fn get_sent(&self, source: &str) -> Result<Option<SentRecord>, StoreError> {
        Ok(self.sent.get(source).map(|e| *e.value()))
    }

    fn put_sent(&self, source: &str, record: SentRecord) -> Result<(), StoreError> {
        self.sent.insert(source.to_string(), record);
        Ok(())
    }

    fn get_thumbnail(&self, id: &str) -> Result<Option<Thumbnail>, StoreError> {
        Ok(self.thumbnails.get(id).map(|e| e.value().clone()))
    }

    fn put_thumbnail(&self, id: &str, thumbnail: &Thumbnail) -> Result<(), StoreError> {
        self.thumbnails.insert(id.to_string(), thumbnail.clone());
        Ok(())
    }
}
