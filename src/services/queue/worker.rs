use crate::core::config::QueueConfig;
use crate::core::error::AppResult;
use crate::core::models::{JobState, NotificationJob};
use crate::infrastructure::smtp::MailTransport;
use crate::services::queue::{JobStore, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Pool of consumers draining the notification queue.
///
/// Each worker loops claim → send → complete/fail. Claims are leases held in
/// the store, so workers coordinate through the database alone.
pub struct WorkerPool {
    store: Arc<JobStore>,
    transport: Arc<dyn MailTransport>,
    workers: usize,
    lease: Duration,
    poll_interval: Duration,
    policy: RetryPolicy,
}

impl WorkerPool {
    pub fn new(store: Arc<JobStore>, transport: Arc<dyn MailTransport>, config: &QueueConfig) -> Self {
        Self {
            store,
            transport,
            workers: config.workers,
            lease: Duration::from_secs(config.lease_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            policy: RetryPolicy {
                max_attempts: config.max_attempts,
                base_delay: Duration::from_millis(config.base_delay_ms),
                max_delay: Duration::from_millis(config.max_delay_ms),
            },
        }
    }

    /// Run the pool until the shutdown channel closes (or receives a signal).
    pub async fn run(self: Arc<Self>, shutdown: async_channel::Receiver<()>) {
        let mut handles = Vec::with_capacity(self.workers);

        for index in 0..self.workers {
            let pool = self.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                pool.worker_loop(index, shutdown).await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Queue worker task panicked: {}", e);
            }
        }
    }

    async fn worker_loop(&self, index: usize, shutdown: async_channel::Receiver<()>) {
        info!("Queue worker {} started", index);

        loop {
            match self.store.claim(self.lease).await {
                Ok(Some(job)) => {
                    self.dispatch(job).await;
                    if shutdown_requested(&shutdown) {
                        break;
                    }
                }
                Ok(None) => {
                    if self.idle_or_shutdown(&shutdown).await {
                        break;
                    }
                }
                Err(e) => {
                    error!("Queue worker {} failed to claim a job: {}", index, e);
                    if self.idle_or_shutdown(&shutdown).await {
                        break;
                    }
                }
            }
        }

        info!("Queue worker {} stopped", index);
    }

    /// Sleep one poll interval; true when shutdown was requested meanwhile.
    async fn idle_or_shutdown(&self, shutdown: &async_channel::Receiver<()>) -> bool {
        tokio::select! {
            _ = shutdown.recv() => true,
            _ = tokio::time::sleep(self.poll_interval) => false,
        }
    }

    /// Drain the queue in the current task until nothing is pending.
    /// Used by one-shot runs; waits out retry backoffs and unexpired leases.
    pub async fn drain(&self) -> AppResult<usize> {
        let mut dispatched = 0;

        loop {
            match self.store.claim(self.lease).await? {
                Some(job) => {
                    self.dispatch(job).await;
                    dispatched += 1;
                }
                None => {
                    let counts = self.store.counts().await?;
                    if counts.waiting == 0 && counts.active == 0 {
                        break;
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        Ok(dispatched)
    }

    async fn dispatch(&self, job: NotificationJob) {
        info!(
            "Dispatching job {} to {} (attempt {})",
            job.id,
            job.to,
            job.attempt + 1
        );

        match self.transport.send(&job.to, &job.subject, &job.text).await {
            Ok(()) => match self.store.complete(job.id).await {
                Ok(()) => info!("Job {} completed", job.id),
                Err(e) => error!("Failed to record completion of job {}: {}", job.id, e),
            },
            Err(send_err) => {
                match self
                    .store
                    .fail(job.id, &send_err.to_string(), &self.policy)
                    .await
                {
                    Ok(JobState::Failed) => {
                        error!("Job {} failed permanently: {}", job.id, send_err)
                    }
                    Ok(_) => warn!("Job {} will be retried: {}", job.id, send_err),
                    Err(e) => error!("Failed to record failure of job {}: {}", job.id, e),
                }
            }
        }
    }
}

fn shutdown_requested(shutdown: &async_channel::Receiver<()>) -> bool {
    match shutdown.try_recv() {
        Ok(()) => true,
        Err(async_channel::TryRecvError::Closed) => true,
        Err(async_channel::TryRecvError::Empty) => false,
    }
}
