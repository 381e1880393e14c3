//! Triage state machine
//!
//! `Mentions` owns every mention state transition. The query methods log and
//! return empty results on store errors, so the presentation layer never has
//! to handle a failed read. The contract methods at the bottom are what an
//! HTTP layer calls; they take the caller's admin capability as a boolean.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use mention_core::{
    Mention, MentionError, MentionQuery, MentionState, MentionWithKey, Store, Thumbnail,
};
use mention_pipeline::{fast_validate, TargetPolicy};

/// Outcome of an inbound delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Stored as untriaged under `key`
    Accepted { key: String },
    /// Failed structural validation or could not be stored
    Rejected { reason: String },
}

/// Received mentions and their triage
#[derive(Clone)]
pub struct Mentions {
    store: Arc<dyn Store>,
    policy: TargetPolicy,
}

impl Mentions {
    pub fn new(store: Arc<dyn Store>, policy: TargetPolicy) -> Self {
        Self { store, policy }
    }

    /// Upsert `mention` under its pair key, replacing any stored state
    pub fn put(&self, mention: &Mention) -> Result<String, MentionError> {
        let key = mention.key();
        self.store.put_mention(&key, mention)?;
        debug!("Stored mention {} ({})", key, mention.state);
        Ok(key)
    }

    fn query(&self, query: MentionQuery) -> Vec<MentionWithKey> {
        match self.store.query_mentions(&query) {
            Ok(found) => found,
            Err(e) => {
                warn!("Failed while reading mentions: {}", e);
                Vec::new()
            }
        }
    }

    pub fn get_by_target_good(&self, target: &str) -> Vec<Mention> {
        self.query(MentionQuery::new().target(target).state(MentionState::Good))
            .into_iter()
            .map(|m| m.mention)
            .collect()
    }

    pub fn get_by_target_all(&self, target: &str) -> Vec<Mention> {
        self.query(MentionQuery::new().target(target))
            .into_iter()
            .map(|m| m.mention)
            .collect()
    }

    /// A page of mentions, most recently received first
    pub fn list_for_triage(&self, limit: usize, offset: usize) -> Vec<MentionWithKey> {
        self.query(MentionQuery::new().newest_first().limit(limit).offset(offset))
    }

    /// Mentions waiting for the validation sweep
    pub fn queued(&self) -> Vec<MentionWithKey> {
        self.query(MentionQuery::new().state(MentionState::Untriaged))
    }

    /// Read-modify-write of a single mention's state.
    ///
    /// Fails with `TransactionConflict` if the record changed between the read
    /// and the write. There is no retry.
    pub fn update_state(&self, key: &str, state: MentionState) -> Result<(), MentionError> {
        let current = self
            .store
            .get_mention(key)?
            .ok_or_else(|| MentionError::NotFound(key.to_string()))?;

        let mut mention = current.record;
        mention.state = state;
        self.store.commit_mention(key, current.version, &mention)?;

        info!("Mention {} is now {}", key, state);
        Ok(())
    }

    pub fn get_thumbnail(&self, id: &str) -> Result<Thumbnail, MentionError> {
        self.store
            .get_thumbnail(id)?
            .ok_or_else(|| MentionError::NotFound(id.to_string()))
    }

    /// Accept an inbound delivery after structural validation
    pub fn submit_mention(&self, source: &str, target: &str) -> Submission {
        if let Err(e) = fast_validate(source, target, &self.policy) {
            debug!("Rejected mention {} -> {}: {}", source, target, e);
            return Submission::Rejected {
                reason: e.to_string(),
            };
        }

        match self.put(&Mention::new(source, target)) {
            Ok(key) => {
                info!("Queued mention {} -> {}", source, target);
                Submission::Accepted { key }
            }
            Err(e) => {
                error!("Failed to store mention {} -> {}: {}", source, target, e);
                Submission::Rejected {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Triage listing for administrators; empty for everyone else
    pub fn triage_page(&self, is_admin: bool, limit: usize, offset: usize) -> Vec<MentionWithKey> {
        if !is_admin {
            return Vec::new();
        }
        self.list_for_triage(limit, offset)
    }

    /// Operator override of a mention's state
    pub fn update_mention(&self, is_admin: bool, key: &str, state: &str) -> Result<(), MentionError> {
        if !is_admin {
            return Err(MentionError::Unauthorized);
        }
        let state: MentionState = state.parse()?;
        self.update_state(key, state)
    }

    /// Verified mentions of `target`, for display
    pub fn good_mentions_for(&self, target: &str) -> Vec<Mention> {
        self.get_by_target_good(target)
    }

    /// Encoded thumbnail bytes
    pub fn thumbnail(&self, id: &str) -> Result<Vec<u8>, MentionError> {
        Ok(self.get_thumbnail(id)?.image_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crate::testing::BrokenStore;
    use mention_core::MemoryStore;

    const TARGET: &str = "https://bitworking.org/news/2018/01/webmention-only";

    fn mentions() -> (Arc<MemoryStore>, Mentions) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Mentions::new(store, TargetPolicy::default()))
    }

    #[test]
    fn test_submit_accepts_and_queues() {
        let (store, mentions) = mentions();

        let key = match mentions.submit_mention("https://s.example/reply", TARGET) {
            Submission::Accepted { key } => key,
            other => panic!("expected acceptance, got {other:?}"),
        };

        let stored = store.get_mention(&key).unwrap().unwrap();
        assert_eq!(stored.record.state, MentionState::Untriaged);
        assert_eq!(mentions.queued().len(), 1);
    }

    #[test]
    fn test_submit_rejects_invalid_pair() {
        let (store, mentions) = mentions();

        let submission = mentions.submit_mention("https://s.example/", "https://example.com/");
        assert!(matches!(submission, Submission::Rejected { .. }));
        assert_eq!(store.mention_count(), 0);
    }

    #[test]
    fn test_repeat_delivery_is_one_record() {
        let (store, mentions) = mentions();

        let first = mentions.submit_mention("https://s.example/reply", TARGET);
        let second = mentions.submit_mention("https://s.example/reply", TARGET);

        assert_eq!(first, second);
        assert_eq!(store.mention_count(), 1);
    }

    #[test]
    fn test_put_overwrites_triage_decision() {
        let (_, mentions) = mentions();
        let mention = Mention::new("https://s.example/reply", TARGET);
        let key = mentions.put(&mention.clone().with_state(MentionState::Good)).unwrap();

        mentions.put(&mention).unwrap();
        assert_eq!(mentions.get_by_target_all(TARGET)[0].state, MentionState::Untriaged);
        assert!(mentions.good_mentions_for(TARGET).is_empty());
        assert_eq!(key, mention.key());
    }

    #[test]
    fn test_good_mentions_filtered_by_target_and_state() {
        let (_, mentions) = mentions();
        mentions
            .put(&Mention::new("https://a.example/", TARGET).with_state(MentionState::Good))
            .unwrap();
        mentions
            .put(&Mention::new("https://b.example/", TARGET).with_state(MentionState::Spam))
            .unwrap();
        mentions
            .put(&Mention::new("https://c.example/", "https://bitworking.org/other").with_state(MentionState::Good))
            .unwrap();

        let good = mentions.good_mentions_for(TARGET);
        assert_eq!(good.len(), 1);
        assert_eq!(good[0].source, "https://a.example/");
        assert_eq!(mentions.get_by_target_all(TARGET).len(), 2);
    }

    #[test]
    fn test_triage_page_newest_first_and_admin_only() {
        let (_, mentions) = mentions();
        let now = Utc::now();
        for i in 0..5 {
            let source = format!("https://s.example/{i}");
            mentions
                .put(&Mention::received_at(&source, TARGET, now - Duration::minutes(i)))
                .unwrap();
        }

        let page = mentions.triage_page(true, 2, 1);
        let sources: Vec<_> = page.iter().map(|m| m.mention.source.as_str()).collect();
        assert_eq!(sources, vec!["https://s.example/1", "https://s.example/2"]);

        assert!(mentions.triage_page(false, 20, 0).is_empty());
    }

    #[test]
    fn test_update_mention() {
        let (_, mentions) = mentions();
        let Submission::Accepted { key } = mentions.submit_mention("https://s.example/", TARGET)
        else {
            panic!("expected acceptance");
        };

        assert!(matches!(
            mentions.update_mention(false, &key, "good"),
            Err(MentionError::Unauthorized)
        ));
        assert!(matches!(
            mentions.update_mention(true, &key, "excellent"),
            Err(MentionError::Parse(_))
        ));
        assert!(matches!(
            mentions.update_mention(true, "missing", "good"),
            Err(MentionError::NotFound(_))
        ));

        mentions.update_mention(true, &key, "good").unwrap();
        assert_eq!(mentions.good_mentions_for(TARGET).len(), 1);

        // overrides are unguarded
        mentions.update_mention(true, &key, "untriaged").unwrap();
        assert!(mentions.good_mentions_for(TARGET).is_empty());
    }

    #[test]
    fn test_update_conflict_surfaces_without_retry() {
        let store = Arc::new(BrokenStore {
            conflict_commits: true,
            ..Default::default()
        });
        let mentions = Mentions::new(store, TargetPolicy::default());
        let key = mentions.put(&Mention::new("https://s.example/", TARGET)).unwrap();

        assert!(matches!(
            mentions.update_state(&key, MentionState::Spam),
            Err(MentionError::TransactionConflict(_))
        ));
    }

    #[test]
    fn test_read_failures_yield_empty_results() {
        let store = Arc::new(BrokenStore {
            fail_reads: true,
            ..Default::default()
        });
        let mentions = Mentions::new(store, TargetPolicy::default());
        mentions
            .put(&Mention::new("https://s.example/", TARGET).with_state(MentionState::Good))
            .unwrap();

        assert!(mentions.good_mentions_for(TARGET).is_empty());
        assert!(mentions.triage_page(true, 20, 0).is_empty());
    }

    #[test]
    fn test_thumbnail_lookup() {
        let (store, mentions) = mentions();
        let thumbnail = Thumbnail::new(vec![1, 2, 3]);
        store.put_thumbnail(&thumbnail.id(), &thumbnail).unwrap();

        assert_eq!(mentions.thumbnail(&thumbnail.id()).unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            mentions.thumbnail("absent"),
            Err(MentionError::NotFound(_))
        ));
    }
}
