use crate::core::error::AppResult;
use crate::core::models::Category;
use crate::infrastructure::gmail::MailProvider;
use crate::services::triage::classifier::Classifier;
use crate::services::triage::labels::LabelRegistry;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one triage pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TriageReport {
    /// Messages that made it through classify and label-apply.
    pub processed: usize,
    /// Messages dropped because one of their steps failed.
    pub skipped: usize,
    /// Deduplicated sender addresses classified Interested, in first-seen
    /// order. Feeds the notification queue producer.
    pub interested: Vec<String>,
}

/// Orchestrates fetch → classify → resolve label → apply label per message.
///
/// Messages are independent: they run under a bounded fan-out and a failure
/// in any step skips that message without aborting the batch.
pub struct TriagePipeline {
    mail: Arc<dyn MailProvider>,
    classifier: Classifier,
    labels: Arc<LabelRegistry>,
    query: String,
    max_messages: usize,
    fan_out: usize,
}

impl TriagePipeline {
    pub fn new(
        mail: Arc<dyn MailProvider>,
        classifier: Classifier,
        labels: Arc<LabelRegistry>,
        query: String,
        max_messages: usize,
        fan_out: usize,
    ) -> Self {
        Self {
            mail,
            classifier,
            labels,
            query,
            max_messages,
            fan_out,
        }
    }

    /// Run one triage pass. Only a failure to list candidate messages is a
    /// run-level error; everything after that is per-message.
    pub async fn run(&self) -> AppResult<TriageReport> {
        let ids = self.mail.list_unread(&self.query, self.max_messages).await?;

        if ids.is_empty() {
            info!("No unread messages matched '{}'", self.query);
            return Ok(TriageReport::default());
        }

        info!("Triaging {} unread messages", ids.len());

        let results: Vec<_> = stream::iter(ids)
            .map(|id| async move {
                let outcome = self.process_message(&id).await;
                (id, outcome)
            })
            .buffer_unordered(self.fan_out)
            .collect()
            .await;

        let mut report = TriageReport::default();
        let mut seen = HashSet::new();

        for (id, outcome) in results {
            match outcome {
                Ok(Some(sender)) => {
                    report.processed += 1;
                    if seen.insert(sender.clone()) {
                        report.interested.push(sender);
                    }
                }
                Ok(None) => report.processed += 1,
                Err(e) => {
                    warn!("Skipping message {}: {}", id, e);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Triage pass finished: {} processed, {} skipped, {} interested senders",
            report.processed,
            report.skipped,
            report.interested.len()
        );

        Ok(report)
    }

    /// Steps for one message run strictly in order; the sender address is
    /// returned only for messages classified Interested.
    async fn process_message(&self, id: &str) -> AppResult<Option<String>> {
        let message = self.mail.fetch_message(id).await?;
        let category = self
            .classifier
            .classify(&message.subject, &message.snippet)
            .await?;
        let label_id = self.labels.resolve(category).await?;
        self.mail.apply_label(id, &label_id).await?;

        info!("Labeled message {} as '{}'", id, category);

        if category == Category::Interested && !message.sender.is_empty() {
            Ok(Some(message.sender))
        } else {
            Ok(None)
        }
    }
}
