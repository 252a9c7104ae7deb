use anyhow::{Context, Result};
use tracing::warn;

/// Mailbox provider settings (Gmail-style REST API).
#[derive(Clone, Debug)]
pub struct MailboxConfig {
    pub api_base: String,
    pub access_token: String,
    pub query: String,
    pub max_messages: usize,
    pub fan_out: usize,
}

/// Language-model provider settings.
#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Outbound SMTP settings for follow-up notifications.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Durable notification queue settings.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub db_path: String,
    pub workers: usize,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub lease_secs: u64,
    pub poll_interval_ms: u64,
    pub notify_subject: String,
    pub notify_body: String,
}

impl QueueConfig {
    /// Load just the queue section from environment variables (and `.env`
    /// when present). Needs no mailbox, classifier, or SMTP credentials, so
    /// queue inspection works without them.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            db_path: env_or("QUEUE_DB_PATH", "mail-triage.db"),
            workers: env_parse("QUEUE_WORKERS", 2)?,
            max_attempts: env_parse("QUEUE_MAX_ATTEMPTS", 5)?,
            base_delay_ms: env_parse("QUEUE_BASE_DELAY_MS", 5000)?,
            max_delay_ms: env_parse("QUEUE_MAX_DELAY_MS", 300_000)?,
            lease_secs: env_parse("QUEUE_LEASE_SECS", 60)?,
            poll_interval_ms: env_parse("QUEUE_POLL_INTERVAL_MS", 500)?,
            notify_subject: env_or("NOTIFY_SUBJECT", "Thanks for your interest"),
            notify_body: env_or(
                "NOTIFY_BODY",
                "Thank you for your interest! We will get back to you shortly.",
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("QUEUE_WORKERS must be greater than 0");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("QUEUE_MAX_ATTEMPTS must be greater than 0");
        }
        if self.base_delay_ms == 0 {
            anyhow::bail!("QUEUE_BASE_DELAY_MS must be greater than 0");
        }
        if self.max_delay_ms < self.base_delay_ms {
            anyhow::bail!("QUEUE_MAX_DELAY_MS must be at least QUEUE_BASE_DELAY_MS");
        }
        if self.lease_secs == 0 {
            anyhow::bail!("QUEUE_LEASE_SECS must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub mailbox: MailboxConfig,
    pub classifier: ClassifierConfig,
    pub smtp: SmtpConfig,
    pub queue: QueueConfig,
    /// Seconds between triage passes in watch mode.
    pub watch_interval: u64,
}

impl AppConfig {
    /// Load from environment variables (and `.env` when present).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            mailbox: MailboxConfig {
                api_base: env_or("GMAIL_API_BASE", "https://gmail.googleapis.com/gmail/v1"),
                access_token: env_required("GMAIL_ACCESS_TOKEN")?,
                query: env_or("MAIL_QUERY", "is:unread category:primary"),
                max_messages: env_parse("MAIL_MAX_MESSAGES", 10)?,
                fan_out: env_parse("MAIL_FAN_OUT", 4)?,
            },
            classifier: ClassifierConfig {
                api_base: env_or("OPENAI_API_BASE", "https://api.openai.com/v1"),
                api_key: env_required("OPENAI_API_KEY")?,
                model: env_or("OPENAI_MODEL", "gpt-3.5-turbo"),
                max_tokens: env_parse("OPENAI_MAX_TOKENS", 50)?,
            },
            smtp: SmtpConfig {
                server: env_or("SMTP_SERVER", "smtp.gmail.com"),
                port: env_parse("SMTP_PORT", 587)?,
                username: env_required("SMTP_USER")?,
                password: env_required("SMTP_PASS")?,
            },
            queue: QueueConfig::from_env()?,
            watch_interval: env_parse("WATCH_INTERVAL_SECS", 60)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        if self.smtp.port == 0 {
            anyhow::bail!("Invalid SMTP port: {}", self.smtp.port);
        }
        if self.smtp.server.is_empty() {
            anyhow::bail!("SMTP server cannot be empty");
        }
        if self.mailbox.max_messages == 0 {
            anyhow::bail!("MAIL_MAX_MESSAGES must be greater than 0");
        }
        if self.mailbox.fan_out == 0 {
            anyhow::bail!("MAIL_FAN_OUT must be greater than 0");
        }
        self.queue.validate()?;
        if self.watch_interval == 0 {
            anyhow::bail!("WATCH_INTERVAL_SECS must be greater than 0");
        }
        if self.watch_interval > 3600 {
            warn!(
                "Watch interval {} is very long (>1 hour), is this intended?",
                self.watch_interval
            );
        }
        Ok(())
    }

}

/// Read an environment variable or use the default.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, using the default when unset.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

/// Read a required environment variable.
fn env_required(key: &str) -> Result<String> {
    std::env::var(key).context(format!("{} not set in environment or .env file", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            mailbox: MailboxConfig {
                api_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
                access_token: "token".to_string(),
                query: "is:unread".to_string(),
                max_messages: 10,
                fan_out: 4,
            },
            classifier: ClassifierConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                api_key: "key".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                max_tokens: 50,
            },
            smtp: SmtpConfig {
                server: "smtp.example.com".to_string(),
                port: 587,
                username: "user@example.com".to_string(),
                password: "secret".to_string(),
            },
            queue: QueueConfig {
                db_path: "test.db".to_string(),
                workers: 2,
                max_attempts: 5,
                base_delay_ms: 5000,
                max_delay_ms: 300_000,
                lease_secs: 60,
                poll_interval_ms: 500,
                notify_subject: "Thanks".to_string(),
                notify_body: "Thanks!".to_string(),
            },
            watch_interval: 60,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_zero_smtp_port_rejected() {
        let mut config = test_config();
        config.smtp.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = test_config();
        config.queue.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_delay_below_base_rejected() {
        let mut config = test_config();
        config.queue.max_delay_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_config_loads_without_credentials() {
        for key in ["GMAIL_ACCESS_TOKEN", "OPENAI_API_KEY", "SMTP_USER", "SMTP_PASS"] {
            std::env::remove_var(key);
        }

        let config = QueueConfig::from_env().unwrap();
        assert_eq!(config.db_path, "mail-triage.db");
        assert_eq!(config.workers, 2);
        assert_eq!(config.max_attempts, 5);
    }
}
