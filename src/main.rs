use anyhow::Result;
use clap::Parser;
use mail_triage::app;
use mail_triage::cli::{Cli, Commands};
use mail_triage::core::config::{AppConfig, QueueConfig};
use mail_triage::infrastructure::logging::init_logging;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("mail-triage")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            max_messages,
            no_drain,
        } => {
            let mut config = AppConfig::from_env()?;
            if let Some(n) = max_messages {
                config.mailbox.max_messages = n;
            }
            config.validate()?;

            info!("Starting one-shot triage run");
            app::run_once(&config, !no_drain).await
        }
        Commands::Watch { interval, workers } => {
            let mut config = AppConfig::from_env()?;
            if let Some(secs) = interval {
                config.watch_interval = secs;
            }
            if let Some(n) = workers {
                config.queue.workers = n;
            }
            config.validate()?;

            app::watch(&config).await
        }
        // Queue inspection reads only the queue settings.
        Commands::Queue => app::queue_status(&QueueConfig::from_env()?).await,
    }
}
