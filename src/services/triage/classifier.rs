use crate::core::error::AppResult;
use crate::core::models::Category;
use crate::infrastructure::completion::CompletionProvider;
use std::sync::Arc;
use tracing::debug;

/// Fixed instruction constraining the model to the three category names.
const SYSTEM_PROMPT: &str =
    "Classify the email content as Interested, Not Interested, or More Information.";

/// Classifies one message's subject and body through a completion provider.
///
/// No internal retry; a provider failure surfaces as a classification error
/// and the retry policy belongs to the caller.
pub struct Classifier {
    provider: Arc<dyn CompletionProvider>,
}

impl Classifier {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn classify(&self, subject: &str, body: &str) -> AppResult<Category> {
        let user_prompt = format!("Subject: {}\n\nBody: {}", subject, body);
        let response = self.provider.complete(SYSTEM_PROMPT, &user_prompt).await?;
        let category = Category::from_response(&response);

        debug!(
            "Classifier response '{}' mapped to category '{}'",
            response, category
        );

        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedProvider {
        response: AppResult<String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl CannedProvider {
        fn ok(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        async fn complete(&self, system: &str, user: &str) -> AppResult<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(AppError::Classification("provider down".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_classify_builds_prompt_and_maps_response() {
        let provider = Arc::new(CannedProvider::ok("Interested"));
        let classifier = Classifier::new(provider.clone());

        let category = classifier
            .classify("Job offer", "We would love to talk")
            .await
            .unwrap();

        assert_eq!(category, Category::Interested);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, SYSTEM_PROMPT);
        assert_eq!(seen[0].1, "Subject: Job offer\n\nBody: We would love to talk");
    }

    #[tokio::test]
    async fn test_classify_defaults_unmatched_text() {
        let provider = Arc::new(CannedProvider::ok("The sender seems undecided."));
        let classifier = Classifier::new(provider);

        let category = classifier.classify("Hello", "Body").await.unwrap();
        assert_eq!(category, Category::MoreInformation);
    }

    #[tokio::test]
    async fn test_classify_propagates_provider_error() {
        let provider = Arc::new(CannedProvider {
            response: Err(AppError::Classification("boom".to_string())),
            seen: Mutex::new(Vec::new()),
        });
        let classifier = Classifier::new(provider);

        let err = classifier.classify("Hello", "Body").await.unwrap_err();
        assert!(matches!(err, AppError::Classification(_)));
    }
}
