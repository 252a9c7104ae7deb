use crate::core::error::{AppError, AppResult};
use crate::core::models::{JobState, NotificationJob};
use crate::services::queue::RetryPolicy;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Pending/terminal job counts per state, for operator inspection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueCounts {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Durable notification job store backed by SQLite.
///
/// The table is the single source of truth for job state; workers take
/// time-bounded leases so a job is never processed by two workers at once
/// and leases orphaned by a crash are reclaimed after expiry.
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        info!("Opening job store at: {}", db_path.display());

        let db_url = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to job store database")?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        let migration_sql = include_str!("../../../migrations/001_create_jobs_table.sql");
        sqlx::query(migration_sql)
            .execute(&self.pool)
            .await
            .context("Failed to run job store migrations")?;

        Ok(())
    }

    /// Enqueue a follow-up notification. When a waiting or active job for
    /// the same recipient already exists the enqueue is suppressed and the
    /// existing job id is returned. The partial unique index on pending
    /// recipients backs this up, so two concurrent enqueues for the same
    /// recipient still insert only one job.
    pub async fn enqueue(&self, to: &str, subject: &str, text: &str) -> AppResult<i64> {
        if let Some(id) = self.pending_job_for(to).await? {
            info!(
                "Suppressed duplicate notification for {} (pending job {})",
                to, id
            );
            return Ok(id);
        }

        let result = sqlx::query(
            "INSERT INTO notification_jobs (recipient, subject, body, state, run_at)
             VALUES (?1, ?2, ?3, 'waiting', ?4)",
        )
        .bind(to)
        .bind(subject)
        .bind(text)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await;

        match result {
            Ok(result) => {
                let id = result.last_insert_rowid();
                info!("Enqueued notification job {} for {}", id, to);
                Ok(id)
            }
            // A concurrent enqueue won the insert between our check and now.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                let id = self.pending_job_for(to).await?.ok_or_else(|| {
                    AppError::Other(anyhow!("Pending job for {} vanished after conflict", to))
                })?;
                info!(
                    "Suppressed duplicate notification for {} (pending job {})",
                    to, id
                );
                Ok(id)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn pending_job_for(&self, to: &str) -> AppResult<Option<i64>> {
        let row = sqlx::query(
            "SELECT id FROM notification_jobs
             WHERE recipient = ?1 AND state IN ('waiting', 'active')
             LIMIT 1",
        )
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get("id")))
    }

    /// Claim the next due job under a lease. Due means waiting with its
    /// run-at in the past, or active with an expired lease (crash reclaim).
    /// The update is a single statement, so concurrent workers can never
    /// claim the same job.
    pub async fn claim(&self, lease: Duration) -> AppResult<Option<NotificationJob>> {
        let now = Utc::now().timestamp_millis();
        let lease_expires_at = now + lease.as_millis() as i64;

        let row = sqlx::query(
            "UPDATE notification_jobs
             SET state = 'active',
                 lease_expires_at = ?1,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = (
                 SELECT id FROM notification_jobs
                 WHERE (state = 'waiting' AND run_at <= ?2)
                    OR (state = 'active' AND lease_expires_at <= ?2)
                 ORDER BY id
                 LIMIT 1
             )
             RETURNING id, recipient, subject, body, attempt, state, last_error",
        )
        .bind(lease_expires_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::job_from_row).transpose()
    }

    /// Mark a job delivered. The completion is recorded once; a crash
    /// between send and this call means the job is re-sent (at-least-once).
    pub async fn complete(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_jobs
             SET state = 'completed',
                 lease_expires_at = NULL,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed send. Schedules a retry after exponential backoff,
    /// or marks the job terminally failed once attempts are exhausted.
    /// Returns the state the job moved to.
    pub async fn fail(&self, id: i64, error: &str, policy: &RetryPolicy) -> AppResult<JobState> {
        let row = sqlx::query("SELECT attempt FROM notification_jobs WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        let attempt: i64 = row.get("attempt");
        let next_attempt = attempt + 1;

        if next_attempt >= policy.max_attempts as i64 {
            sqlx::query(
                "UPDATE notification_jobs
                 SET state = 'failed',
                     attempt = ?1,
                     lease_expires_at = NULL,
                     last_error = ?2,
                     updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?3",
            )
            .bind(next_attempt)
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;

            warn!(
                "Job {} exhausted {} attempts, marking failed: {}",
                id, next_attempt, error
            );
            return Ok(JobState::Failed);
        }

        let delay = policy.backoff_delay_jittered(next_attempt as u32);
        let run_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;

        sqlx::query(
            "UPDATE notification_jobs
             SET state = 'waiting',
                 attempt = ?1,
                 run_at = ?2,
                 lease_expires_at = NULL,
                 last_error = ?3,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?4",
        )
        .bind(next_attempt)
        .bind(run_at)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;

        warn!(
            "Job {} failed (attempt {}), retrying in {:?}: {}",
            id, next_attempt, delay, error
        );
        Ok(JobState::Waiting)
    }

    /// Per-state job counts.
    pub async fn counts(&self) -> AppResult<QueueCounts> {
        let rows = sqlx::query(
            "SELECT state, COUNT(*) AS count FROM notification_jobs GROUP BY state",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = QueueCounts::default();
        for row in rows {
            let state: String = row.get("state");
            let count: i64 = row.get("count");
            match JobState::parse(&state) {
                Some(JobState::Waiting) => counts.waiting = count,
                Some(JobState::Active) => counts.active = count,
                Some(JobState::Completed) => counts.completed = count,
                Some(JobState::Failed) => counts.failed = count,
                None => warn!("Ignoring unknown job state '{}' in store", state),
            }
        }

        Ok(counts)
    }

    /// Terminally failed jobs, oldest first, for the operator surface.
    pub async fn failed_jobs(&self) -> AppResult<Vec<NotificationJob>> {
        let rows = sqlx::query(
            "SELECT id, recipient, subject, body, attempt, state, last_error
             FROM notification_jobs
             WHERE state = 'failed'
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::job_from_row).collect()
    }

    /// Look up one job by id.
    pub async fn get(&self, id: i64) -> AppResult<Option<NotificationJob>> {
        let row = sqlx::query(
            "SELECT id, recipient, subject, body, attempt, state, last_error
             FROM notification_jobs
             WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::job_from_row).transpose()
    }

    fn job_from_row(row: SqliteRow) -> AppResult<NotificationJob> {
        let state: String = row.get("state");
        let state = JobState::parse(&state)
            .ok_or_else(|| AppError::Other(anyhow!("Unknown job state '{}' in store", state)))?;

        Ok(NotificationJob {
            id: row.get("id"),
            to: row.get("recipient"),
            subject: row.get("subject"),
            text: row.get("body"),
            attempt: row.get("attempt"),
            state,
            last_error: row.get("last_error"),
        })
    }
}
