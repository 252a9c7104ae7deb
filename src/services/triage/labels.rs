use crate::core::error::{AppError, AppResult};
use crate::core::models::Category;
use crate::infrastructure::gmail::MailProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Resolves a category to its provider-side label id, creating the label on
/// first use and caching the id for the process lifetime.
pub struct LabelRegistry {
    provider: Arc<dyn MailProvider>,
    // Held across the list/create round-trips so concurrent resolutions
    // cannot race into duplicate provider-side labels.
    cache: Mutex<HashMap<Category, String>>,
}

impl LabelRegistry {
    pub fn new(provider: Arc<dyn MailProvider>) -> Self {
        Self {
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent: repeated calls return the same id with at most one
    /// provider-side create.
    pub async fn resolve(&self, category: Category) -> AppResult<String> {
        let mut cache = self.cache.lock().await;

        if let Some(id) = cache.get(&category) {
            return Ok(id.clone());
        }

        let name = category.label_name();
        let labels = self
            .provider
            .list_labels()
            .await
            .map_err(|e| AppError::LabelResolution {
                category,
                reason: e.to_string(),
            })?;

        let id = match labels.into_iter().find(|l| l.name == name) {
            Some(label) => label.id,
            None => {
                info!("Label '{}' not found, creating it", name);
                self.provider
                    .create_label(name)
                    .await
                    .map_err(|e| AppError::LabelResolution {
                        category,
                        reason: e.to_string(),
                    })?
                    .id
            }
        };

        cache.insert(category, id.clone());
        Ok(id)
    }
}
