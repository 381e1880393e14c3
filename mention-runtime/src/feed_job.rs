//! Outbound feed processing: parse a feed, then dispatch its mentions.

use std::path::Path;
use tracing::info;

use mention_core::MentionError;
use mention_pipeline::{parse_feed, DispatchReport, Dispatcher};

/// Result of processing one feed document
#[derive(Debug, Default)]
pub struct FeedRun {
    /// Entries turned into sources
    pub sources: usize,
    /// Entry problems recorded while parsing
    pub parse_errors: Vec<MentionError>,
    pub dispatch: DispatchReport,
}

pub struct FeedJob {
    dispatcher: Dispatcher,
}

impl FeedJob {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Read and process a feed file
    pub async fn process_feed_file(&self, path: &Path) -> Result<FeedRun, MentionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MentionError::Io(format!("reading {}: {e}", path.display())))?;
        self.process_feed(&bytes).await
    }

    /// Process a feed document already in memory
    pub async fn process_feed(&self, bytes: &[u8]) -> Result<FeedRun, MentionError> {
        let parsed = parse_feed(bytes)?;
        info!(
            "Parsed feed: {} sources, {} entry errors",
            parsed.sources.len(),
            parsed.errors.len()
        );

        let dispatch = self.dispatcher.dispatch(&parsed.sources).await;
        Ok(FeedRun {
            sources: parsed.sources.len(),
            parse_errors: parsed.errors,
            dispatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mention_core::{MemoryStore, Store};
    use mention_net::{NetError, Notifier};
    use std::sync::{Arc, Mutex};

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>https://bitworking.org/</id><title>BitWorking</title>
  <updated>2018-01-13T00:00:00-05:00</updated>
  <entry>
    <id>https://bitworking.org/news/2018/01/webmention-only</id>
    <title>WebMention Only</title>
    <link href="https://bitworking.org/news/2018/01/webmention-only"/>
    <updated>2018-01-13T00:00:00-05:00</updated>
    <content type="html">&lt;a href="https://allinthehead.com/retro/378"&gt;Drew&lt;/a&gt;</content>
  </entry>
  <entry>
    <id>https://bitworking.org/news/undated</id>
    <title>Undated</title>
    <link href="https://bitworking.org/news/undated"/>
    <content type="html">no links</content>
  </entry>
</feed>"#;

    /// Every target advertises `https://wm.example/`
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn discover_endpoint(&self, _target: &str) -> Result<Option<String>, NetError> {
            Ok(Some("https://wm.example/".to_string()))
        }

        async fn send(&self, _endpoint: &str, source: &str, target: &str) -> Result<(), NetError> {
            self.sent
                .lock()
                .unwrap()
                .push((source.to_string(), target.to_string()));
            Ok(())
        }
    }

    fn job(store: Arc<MemoryStore>, notifier: Arc<RecordingNotifier>) -> FeedJob {
        FeedJob::new(Dispatcher::new(store, notifier))
    }

    #[tokio::test]
    async fn test_process_feed_sends_once_across_runs() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let job = job(store.clone(), notifier.clone());

        let first = job.process_feed(FEED.as_bytes()).await.unwrap();
        assert_eq!(first.sources, 2);
        assert_eq!(first.dispatch.sent_count(), 1);
        assert!(store
            .get_sent("https://bitworking.org/news/2018/01/webmention-only")
            .unwrap()
            .is_some());

        let second = job.process_feed(FEED.as_bytes()).await.unwrap();
        assert_eq!(second.dispatch.sent_count(), 0);
        assert_eq!(
            notifier.sent.lock().unwrap().as_slice(),
            [(
                "https://bitworking.org/news/2018/01/webmention-only".to_string(),
                "https://allinthehead.com/retro/378".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_process_feed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atom.xml");
        std::fs::write(&path, FEED).unwrap();

        let job = job(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::default()),
        );
        let run = job.process_feed_file(&path).await.unwrap();
        assert_eq!(run.dispatch.sent_count(), 1);

        assert!(matches!(
            job.process_feed_file(&dir.path().join("missing.xml")).await,
            Err(MentionError::Io(_))
        ));

        let garbage = dir.path().join("garbage.xml");
        std::fs::write(&garbage, "not a feed").unwrap();
        assert!(matches!(
            job.process_feed_file(&garbage).await,
            Err(MentionError::Parse(_))
        ));
    }
}
