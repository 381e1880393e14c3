//! Notification dispatch
//!
//! For each feed source not already covered by its sent record, every target
//! is asked for a webmention endpoint and notified. Per-target failures are
//! collected, never fatal. The sent record is written after all targets of a
//! source were attempted.
//!
//! The sent-record read and the later write are not atomic: two concurrent
//! dispatchers handling the same source can both notify.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use mention_core::{MentionError, MentionSource, SentRecord, Store};
use mention_net::Notifier;

/// What happened to one source -> target notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Sent { endpoint: String },
    /// Target advertises no endpoint; the common case
    NoEndpoint,
    DiscoveryFailed(String),
    DeliveryFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResult {
    pub source: String,
    pub target: String,
    pub outcome: TargetOutcome,
}

/// Summary of one dispatch batch
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Sources skipped because their sent record covers them
    pub skipped: Vec<String>,
    /// Sources whose targets were attempted
    pub processed: Vec<String>,
    pub results: Vec<TargetResult>,
    /// Sent records that could not be written
    pub record_failures: Vec<(String, MentionError)>,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, TargetOutcome::Sent { .. }))
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    TargetOutcome::DiscoveryFailed(_) | TargetOutcome::DeliveryFailed(_)
                )
            })
            .count()
    }
}

/// Sends webmentions for feed sources
pub struct Dispatcher {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Whether `source` was already notified for this update
    fn already_sent(&self, source: &MentionSource) -> bool {
        match self.store.get_sent(&source.source) {
            Ok(Some(record)) => record.covers(source.updated_at),
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to read sent record for {}: {}", source.source, e);
                false
            }
        }
    }

    /// Notify every target of every source that changed since it was last sent
    pub async fn dispatch(&self, sources: &HashMap<String, MentionSource>) -> DispatchReport {
        let mut report = DispatchReport::default();

        let mut keys: Vec<&String> = sources.keys().collect();
        keys.sort();

        for key in keys {
            let source = &sources[key];

            if self.already_sent(source) {
                debug!("Skipping since already sent: {}", source.source);
                report.skipped.push(source.source.clone());
                continue;
            }

            info!("Processing source: {}", source.source);
            for target in &source.targets {
                let outcome = self.notify(&source.source, target).await;
                report.results.push(TargetResult {
                    source: source.source.clone(),
                    target: target.clone(),
                    outcome,
                });
            }

            if let Err(e) = self
                .store
                .put_sent(&source.source, SentRecord::new(source.updated_at))
            {
                warn!("Failed recording sent state for {}: {}", source.source, e);
                report.record_failures.push((source.source.clone(), e.into()));
            }
            report.processed.push(source.source.clone());
        }

        info!(
            "Dispatch finished: {} sent, {} failed, {} sources skipped",
            report.sent_count(),
            report.failure_count(),
            report.skipped.len()
        );
        report
    }

    async fn notify(&self, source: &str, target: &str) -> TargetOutcome {
        debug!("  to target: {}", target);

        let endpoint = match self.notifier.discover_endpoint(target).await {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                debug!("No webmention support at: {}", target);
                return TargetOutcome::NoEndpoint;
            }
            Err(e) => {
                warn!("Failed looking for endpoint at {}: {}", target, e);
                return TargetOutcome::DiscoveryFailed(e.to_string());
            }
        };

        match self.notifier.send(&endpoint, source, target).await {
            Ok(()) => {
                info!("Sent webmention from {} to {}", source, target);
                TargetOutcome::Sent { endpoint }
            }
            Err(e) => {
                warn!("Error sending webmention to {}: {}", target, e);
                TargetOutcome::DeliveryFailed(e.to_string())
            }
        }
    }
}
