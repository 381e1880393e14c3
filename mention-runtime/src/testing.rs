//! Store doubles shared by the runtime tests

use mention_core::{
    MemoryStore, Mention, MentionQuery, MentionWithKey, SentRecord, Store, StoreError, Thumbnail,
    Versioned,
};

/// `MemoryStore` with switchable failures
#[derive(Default)]
pub struct BrokenStore {
    pub inner: MemoryStore,
    pub fail_reads: bool,
    pub fail_writes: bool,
    /// Every commit loses to a concurrent writer
    pub conflict_commits: bool,
}

impl BrokenStore {
    fn unavailable() -> StoreError {
        StoreError::Backend("unavailable".to_string())
    }
}

impl Store for BrokenStore {
    fn get_mention(&self, key: &str) -> Result<Option<Versioned<Mention>>, StoreError> {
        self.inner.get_mention(key)
    }

    fn put_mention(&self, key: &str, mention: &Mention) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(Self::unavailable());
        }
        self.inner.put_mention(key, mention)
    }

    fn commit_mention(
        &self,
        key: &str,
        expected_version: u64,
        mention: &Mention,
    ) -> Result<u64, StoreError> {
        if self.conflict_commits {
            return Err(StoreError::Conflict(key.to_string()));
        }
        self.inner.commit_mention(key, expected_version, mention)
    }

    fn query_mentions(&self, query: &MentionQuery) -> Result<Vec<MentionWithKey>, StoreError> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        self.inner.query_mentions(query)
    }

    fn get_sent(&self, source: &str) -> Result<Option<SentRecord>, StoreError> {
        self.inner.get_sent(source)
    }

    fn put_sent(&self, source: &str, record: SentRecord) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(Self::unavailable());
        }
        self.inner.put_sent(source, record)
    }

    fn get_thumbnail(&self, id: &str) -> Result<Option<Thumbnail>, StoreError> {
        self.inner.get_thumbnail(id)
    }

    fn put_thumbnail(&self, id: &str, thumbnail: &Thumbnail) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(Self::unavailable());
        }
        self.inner.put_thumbnail(id, thumbnail)
    }
}
