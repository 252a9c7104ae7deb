use crate::core::config::{AppConfig, QueueConfig};
use crate::infrastructure::completion::OpenAiClient;
use crate::infrastructure::gmail::GmailClient;
use crate::infrastructure::smtp::SmtpMailer;
use crate::infrastructure::token::TokenProvider;
use crate::services::queue::{JobStore, WorkerPool};
use crate::services::triage::{Classifier, LabelRegistry, TriagePipeline, TriageReport};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Wired-up collaborators for one process.
struct AppContext {
    pipeline: TriagePipeline,
    store: Arc<JobStore>,
    pool: Arc<WorkerPool>,
}

impl AppContext {
    async fn build(config: &AppConfig) -> Result<Self> {
        let tokens = Arc::new(TokenProvider::new(config.mailbox.access_token.clone()));

        let mail = Arc::new(
            GmailClient::new(config.mailbox.api_base.clone(), tokens)
                .context("Failed to build mail provider client")?,
        );

        let completion = Arc::new(
            OpenAiClient::new(
                config.classifier.api_base.clone(),
                config.classifier.api_key.clone(),
                config.classifier.model.clone(),
                config.classifier.max_tokens,
            )
            .context("Failed to build completion client")?,
        );

        let pipeline = TriagePipeline::new(
            mail.clone(),
            Classifier::new(completion),
            Arc::new(LabelRegistry::new(mail)),
            config.mailbox.query.clone(),
            config.mailbox.max_messages,
            config.mailbox.fan_out,
        );

        let store = Arc::new(
            JobStore::new(&config.queue.db_path)
                .await
                .context("Failed to open notification queue store")?,
        );

        let transport = Arc::new(SmtpMailer::new(config.smtp.clone()));
        let pool = Arc::new(WorkerPool::new(store.clone(), transport, &config.queue));

        Ok(Self {
            pipeline,
            store,
            pool,
        })
    }

    /// One triage pass plus enqueue of a follow-up per interested sender.
    async fn triage_and_enqueue(&self, config: &AppConfig) -> Result<TriageReport> {
        let report = self.pipeline.run().await?;

        for sender in &report.interested {
            if let Err(e) = self
                .store
                .enqueue(
                    sender,
                    &config.queue.notify_subject,
                    &config.queue.notify_body,
                )
                .await
            {
                warn!("Failed to enqueue notification for {}: {}", sender, e);
            }
        }

        Ok(report)
    }
}

/// One-shot mode: triage, enqueue, optionally drain the queue, exit.
pub async fn run_once(config: &AppConfig, drain: bool) -> Result<()> {
    let ctx = AppContext::build(config).await?;

    let report = ctx.triage_and_enqueue(config).await?;
    info!(
        "Triage done: {} processed, {} skipped, {} follow-ups queued",
        report.processed,
        report.skipped,
        report.interested.len()
    );

    if drain {
        let dispatched = ctx.pool.drain().await?;
        info!("Queue drained: {} jobs dispatched", dispatched);
    }

    Ok(())
}

/// Long-running mode: triage on an interval with queue workers in the
/// background, until Ctrl-C.
pub async fn watch(config: &AppConfig) -> Result<()> {
    let ctx = AppContext::build(config).await?;

    let (shutdown_tx, shutdown_rx) = async_channel::bounded::<()>(1);
    let pool_handle = tokio::spawn(ctx.pool.clone().run(shutdown_rx));

    info!(
        "Watching mailbox every {} seconds with {} queue workers",
        config.watch_interval, config.queue.workers
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.watch_interval));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match ctx.triage_and_enqueue(config).await {
                    Ok(report) => info!(
                        "Triage pass: {} processed, {} skipped, {} follow-ups queued",
                        report.processed,
                        report.skipped,
                        report.interested.len()
                    ),
                    Err(e) => error!("Triage pass failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested, stopping queue workers");
                break;
            }
        }
    }

    drop(shutdown_tx);
    pool_handle.await.context("Queue worker pool task failed")?;
    Ok(())
}

/// Operator surface: queue counts plus the terminally failed jobs. Takes
/// only the queue section, so inspection needs no provider credentials.
pub async fn queue_status(config: &QueueConfig) -> Result<()> {
    let store = JobStore::new(&config.db_path)
        .await
        .context("Failed to open notification queue store")?;

    let counts = store.counts().await?;
    println!(
        "waiting: {}  active: {}  completed: {}  failed: {}",
        counts.waiting, counts.active, counts.completed, counts.failed
    );

    let failed = store.failed_jobs().await?;
    for job in failed {
        println!(
            "failed job {}: to={} attempts={} last_error={}",
            job.id,
            job.to,
            job.attempt,
            job.last_error.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
