use crate::core::models::Category;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Mail provider error: {0}")]
    Provider(String),

    #[error("Failed to fetch message {message_id}: {reason}")]
    Fetch { message_id: String, reason: String },

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Failed to resolve label '{category}': {reason}")]
    LabelResolution { category: Category, reason: String },

    #[error("Failed to apply label to message {message_id}: {reason}")]
    LabelApply { message_id: String, reason: String },

    #[error("Send error: {0}")]
    Send(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Application-wide Result alias
pub type AppResult<T> = Result<T, AppError>;
