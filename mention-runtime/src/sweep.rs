//! Validation sweep
//!
//! Slow-validates every untriaged mention in turn. A mention that passes
//! becomes `good` with whatever metadata extraction found; anything else
//! becomes `spam`. Each mention is written back on its own, so an abandoned
//! sweep leaves the rest queued.

use tracing::{info, warn};

use mention_core::{MentionError, MentionState};
use mention_pipeline::SlowValidator;

use crate::Mentions;

/// Summary of one sweep
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Keys of mentions marked good
    pub good: Vec<String>,
    /// Keys of mentions marked spam, with the reason
    pub spam: Vec<(String, String)>,
    /// Mentions whose new state could not be written
    pub write_failures: Vec<(String, MentionError)>,
}

impl SweepReport {
    pub fn processed(&self) -> usize {
        self.good.len() + self.spam.len()
    }
}

/// Drives slow validation over the queue
pub struct Sweeper {
    mentions: Mentions,
    validator: SlowValidator,
}

impl Sweeper {
    pub fn new(mentions: Mentions, validator: SlowValidator) -> Self {
        Self {
            mentions,
            validator,
        }
    }

    /// Validate and write back every queued mention
    pub async fn verify_queued(&self) -> SweepReport {
        let queued = self.mentions.queued();
        info!("About to slow verify {} queued mentions", queued.len());

        let mut report = SweepReport::default();

        for entry in queued {
            let key = entry.key;
            let mut mention = entry.mention;
            info!("Verifying queued mention from {}", mention.source);

            match self.validator.validate(&mut mention).await {
                Ok(()) => {
                    mention.state = MentionState::Good;
                    report.good.push(key.clone());
                }
                Err(e) => {
                    warn!("Failed to validate mention from {}: {}", mention.source, e);
                    mention.state = MentionState::Spam;
                    report.spam.push((key.clone(), e.to_string()));
                }
            }

            if let Err(e) = self.mentions.put(&mention) {
                warn!("Failed to save validated mention {}: {}", key, e);
                report.write_failures.push((key, e));
            }
        }

        info!(
            "Sweep finished: {} good, {} spam, {} write failures",
            report.good.len(),
            report.spam.len(),
            report.write_failures.len()
        );
        report
    }
}
