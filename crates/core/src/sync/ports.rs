//! Port interfaces for outbox processing

use agendapro_domain::{Result, SyncJob};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Trait for managing the calendar sync outbox
///
/// Jobs are enqueued by the booking service in the same database as the
/// primary write and drained by a background worker.
#[async_trait]
pub trait OutboxQueue: Send + Sync {
    /// Enqueue a sync job for later processing
    async fn enqueue(&self, job: &SyncJob) -> Result<()>;

    /// Atomically claim up to `limit` due pending jobs: each returned job is
    /// marked processing with its attempt counter already incremented
    async fn dequeue_batch(&self, limit: usize) -> Result<Vec<SyncJob>>;

    /// Mark a job as successfully executed
    async fn mark_sent(&self, id: Uuid) -> Result<()>;

    /// Mark a job as permanently failed with the final error
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()>;

    /// Return a job to pending for another attempt after `next_attempt_at`
    async fn reschedule(&self, id: Uuid, error: &str, next_attempt_at: DateTime<Utc>)
        -> Result<()>;
}

/// Trait for executing a single claimed sync job
#[async_trait]
pub trait SyncJobHandler: Send + Sync {
    /// Execute the job against the calendar provider
    async fn handle(&self, job: &SyncJob) -> Result<()>;
}
