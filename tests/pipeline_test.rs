use async_trait::async_trait;
use mail_triage::core::error::{AppError, AppResult};
use mail_triage::core::models::Message;
use mail_triage::infrastructure::completion::CompletionProvider;
use mail_triage::infrastructure::gmail::{MailProvider, ProviderLabel};
use mail_triage::services::triage::{Classifier, LabelRegistry, TriagePipeline};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory mail provider: canned messages, optional per-id fetch failures,
/// and a record of every label application.
struct FakeMailbox {
    ids: Vec<String>,
    messages: HashMap<String, Message>,
    failing_ids: Vec<String>,
    applied: Mutex<Vec<(String, String)>>,
    created_labels: Mutex<Vec<String>>,
}

impl FakeMailbox {
    fn new(messages: Vec<Message>, failing_ids: Vec<&str>) -> Self {
        let mut ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
        ids.extend(failing_ids.iter().map(|s| s.to_string()));
        ids.sort();

        Self {
            ids,
            messages: messages.into_iter().map(|m| (m.id.clone(), m)).collect(),
            failing_ids: failing_ids.into_iter().map(String::from).collect(),
            applied: Mutex::new(Vec::new()),
            created_labels: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MailProvider for FakeMailbox {
    async fn list_unread(&self, _query: &str, max: usize) -> AppResult<Vec<String>> {
        Ok(self.ids.iter().take(max).cloned().collect())
    }

    async fn fetch_message(&self, id: &str) -> AppResult<Message> {
        if self.failing_ids.iter().any(|f| f == id) {
            return Err(AppError::Fetch {
                message_id: id.to_string(),
                reason: "provider returned 500".to_string(),
            });
        }
        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::Fetch {
                message_id: id.to_string(),
                reason: "unknown message".to_string(),
            })
    }

    async fn list_labels(&self) -> AppResult<Vec<ProviderLabel>> {
        Ok(self
            .created_labels
            .lock()
            .unwrap()
            .iter()
            .map(|name| ProviderLabel {
                id: format!("label-{}", name),
                name: name.clone(),
            })
            .collect())
    }

    async fn create_label(&self, name: &str) -> AppResult<ProviderLabel> {
        self.created_labels.lock().unwrap().push(name.to_string());
        Ok(ProviderLabel {
            id: format!("label-{}", name),
            name: name.to_string(),
        })
    }

    async fn apply_label(&self, message_id: &str, label_id: &str) -> AppResult<()> {
        self.applied
            .lock()
            .unwrap()
            .push((message_id.to_string(), label_id.to_string()));
        Ok(())
    }
}

/// Completion provider that answers based on keywords in the user prompt.
struct KeywordCompleter;

#[async_trait]
impl CompletionProvider for KeywordCompleter {
    async fn complete(&self, _system: &str, user: &str) -> AppResult<String> {
        if user.contains("love to talk") {
            Ok("Interested".to_string())
        } else if user.contains("unsubscribe") {
            Ok("The sender is not interested.".to_string())
        } else {
            Ok("More Information is needed.".to_string())
        }
    }
}

fn message(id: &str, sender: &str, snippet: &str) -> Message {
    Message {
        id: id.to_string(),
        subject: format!("Subject {}", id),
        sender: sender.to_string(),
        snippet: snippet.to_string(),
    }
}

fn pipeline(mailbox: Arc<FakeMailbox>) -> TriagePipeline {
    TriagePipeline::new(
        mailbox.clone(),
        Classifier::new(Arc::new(KeywordCompleter)),
        Arc::new(LabelRegistry::new(mailbox)),
        "is:unread".to_string(),
        10,
        4,
    )
}

#[tokio::test]
async fn test_batch_survives_single_message_failure() {
    let mailbox = Arc::new(FakeMailbox::new(
        vec![
            message("m1", "a@x.com", "We would love to talk"),
            message("m2", "b@x.com", "Please unsubscribe me"),
            message("m4", "c@x.com", "Can you send pricing?"),
            message("m5", "d@x.com", "We would love to talk soon"),
        ],
        vec!["m3"],
    ));

    let report = pipeline(mailbox.clone()).run().await.unwrap();

    assert_eq!(report.processed, 4);
    assert_eq!(report.skipped, 1);

    let mut interested = report.interested.clone();
    interested.sort();
    assert_eq!(interested, vec!["a@x.com", "d@x.com"]);

    // Labels were applied to every surviving message, none for m3.
    let applied = mailbox.applied.lock().unwrap();
    assert_eq!(applied.len(), 4);
    assert!(applied.iter().all(|(id, _)| id != "m3"));
}

#[tokio::test]
async fn test_interested_senders_are_deduplicated() {
    let mailbox = Arc::new(FakeMailbox::new(
        vec![
            message("m1", "a@x.com", "We would love to talk"),
            message("m2", "a@x.com", "Still would love to talk"),
            message("m3", "b@x.com", "love to talk as well"),
        ],
        vec![],
    ));

    let report = pipeline(mailbox).run().await.unwrap();

    assert_eq!(report.processed, 3);

    let mut interested = report.interested.clone();
    interested.sort();
    assert_eq!(interested, vec!["a@x.com", "b@x.com"]);
}

#[tokio::test]
async fn test_empty_mailbox_reports_nothing() {
    let mailbox = Arc::new(FakeMailbox::new(vec![], vec![]));

    let report = pipeline(mailbox).run().await.unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(report.skipped, 0);
    assert!(report.interested.is_empty());
}

#[tokio::test]
async fn test_interested_message_without_sender_is_not_queued() {
    let mailbox = Arc::new(FakeMailbox::new(
        vec![message("m1", "", "We would love to talk")],
        vec![],
    ));

    let report = pipeline(mailbox.clone()).run().await.unwrap();

    assert_eq!(report.processed, 1);
    assert!(report.interested.is_empty());
    // The label is still applied even though no follow-up is queued.
    assert_eq!(mailbox.applied.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_one_label_created_per_category_across_batch() {
    let mailbox = Arc::new(FakeMailbox::new(
        vec![
            message("m1", "a@x.com", "We would love to talk"),
            message("m2", "b@x.com", "love to talk"),
            message("m3", "c@x.com", "love to talk too"),
        ],
        vec![],
    ));

    pipeline(mailbox.clone()).run().await.unwrap();

    let created = mailbox.created_labels.lock().unwrap();
    assert_eq!(created.as_slice(), ["Interested"]);
}
