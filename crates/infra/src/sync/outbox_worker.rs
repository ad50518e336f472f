//! Outbox worker for periodic calendar sync processing.
//!
//! Polls the sync outbox for due pending jobs, executes each one against the
//! calendar provider through the job handler, and settles the outcome: sent
//! on success, rescheduled with exponential backoff while attempts remain,
//! failed once the attempt budget is spent. Join handles are tracked,
//! cancellation is explicit, and batch processing is wrapped in a timeout.

use std::sync::Arc;
use std::time::Duration;

use agendapro_core::{OutboxQueue, SyncJobHandler};
use agendapro_domain::constants::{
    DEFAULT_OUTBOX_BATCH_SIZE, DEFAULT_OUTBOX_MAX_ATTEMPTS, DEFAULT_OUTBOX_POLL_SECS,
    MAX_ERROR_REASON_LENGTH,
};
use agendapro_domain::WorkerConfig;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the outbox worker.
#[derive(Debug, Clone)]
pub struct OutboxWorkerConfig {
    /// Maximum number of jobs to claim per batch
    pub batch_size: usize,
    /// Interval between polling attempts
    pub poll_interval: Duration,
    /// Timeout for processing a single batch
    pub processing_timeout: Duration,
    /// Attempt budget before a job is marked permanently failed
    pub max_attempts: u32,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for OutboxWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_OUTBOX_BATCH_SIZE,
            poll_interval: Duration::from_secs(DEFAULT_OUTBOX_POLL_SECS),
            processing_timeout: Duration::from_secs(300),
            max_attempts: DEFAULT_OUTBOX_MAX_ATTEMPTS,
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl OutboxWorkerConfig {
    /// Build the worker configuration from the worker section of the
    /// application config.
    pub fn from_worker_config(config: &WorkerConfig) -> Self {
        Self {
            batch_size: config.outbox_batch_size,
            poll_interval: Duration::from_secs(config.outbox_poll_seconds),
            max_attempts: config.outbox_max_attempts,
            ..Default::default()
        }
    }
}

/// Outbox worker with explicit lifecycle management.
pub struct OutboxWorker {
    outbox: Arc<dyn OutboxQueue>,
    handler: Arc<dyn SyncJobHandler>,
    config: OutboxWorkerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl OutboxWorker {
    /// Create a new outbox worker with the given configuration.
    pub fn new(
        outbox: Arc<dyn OutboxQueue>,
        handler: Arc<dyn SyncJobHandler>,
        config: OutboxWorkerConfig,
    ) -> Self {
        Self { outbox, handler, config, cancellation: CancellationToken::new(), task_handle: None }
    }

    /// Start the worker, spawning the background processing task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), String> {
        if self.is_running() {
            return Err("Worker already running".to_string());
        }

        info!("Starting outbox worker");

        // Create fresh cancellation token
        self.cancellation = CancellationToken::new();

        let outbox = Arc::clone(&self.outbox);
        let handler = Arc::clone(&self.handler);
        let config = self.config.clone();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::process_loop(outbox, handler, config, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("Outbox worker started");

        Ok(())
    }

    /// Stop the worker and wait for the processing task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), String> {
        if !self.is_running() {
            return Err("Worker not running".to_string());
        }

        info!("Stopping outbox worker");

        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            let join_timeout = self.config.join_timeout;
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Worker task panicked: {}", e);
                    return Err("Worker task panicked".to_string());
                }
                Err(_) => {
                    warn!("Worker task did not complete within timeout");
                    return Err("Worker task timeout".to_string());
                }
            }
        }

        info!("Outbox worker stopped");
        self.cancellation = CancellationToken::new();

        Ok(())
    }

    /// Returns true when a worker instance is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Background processing loop.
    async fn process_loop(
        outbox: Arc<dyn OutboxQueue>,
        handler: Arc<dyn SyncJobHandler>,
        config: OutboxWorkerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Outbox worker process loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.poll_interval) => {
                    match tokio::time::timeout(
                        config.processing_timeout,
                        Self::process_batch(
                            &outbox,
                            &handler,
                            config.batch_size,
                            config.max_attempts,
                        ),
                    )
                    .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            error!(error = %e, "Batch processing failed");
                        }
                        Err(_) => {
                            warn!(
                                timeout_secs = config.processing_timeout.as_secs(),
                                "Batch processing timed out"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Process a single batch of claimed outbox jobs.
    async fn process_batch(
        outbox: &Arc<dyn OutboxQueue>,
        handler: &Arc<dyn SyncJobHandler>,
        batch_size: usize,
        max_attempts: u32,
    ) -> Result<(), String> {
        // Claim due pending jobs; each comes back with its attempt counter
        // already incremented.
        let jobs = outbox
            .dequeue_batch(batch_size)
            .await
            .map_err(|e| format!("Failed to dequeue batch: {e}"))?;

        if jobs.is_empty() {
            debug!("No pending jobs to process");
            return Ok(());
        }

        info!(count = jobs.len(), "Processing outbox batch");

        let mut fatal_errors: Vec<String> = Vec::new();
        let mut sent = 0_u32;
        let mut rescheduled = 0_u32;
        let mut failed = 0_u32;

        for job in jobs {
            match handler.handle(&job).await {
                Ok(()) => {
                    debug!(job_id = %job.id, operation = %job.operation, "Sync job executed");
                    if let Err(err) = outbox.mark_sent(job.id).await {
                        let msg = err.to_string();
                        warn!(job_id = %job.id, error = %msg, "mark_sent failed");
                        fatal_errors.push(format!("mark_sent error for {}: {}", job.id, msg));
                    } else {
                        sent = sent.saturating_add(1);
                    }
                }
                Err(err) => {
                    let reason = truncate_reason(&err.to_string());

                    if job.attempts >= max_attempts {
                        warn!(
                            job_id = %job.id,
                            attempts = job.attempts,
                            error = %reason,
                            "Sync job exhausted its attempts"
                        );
                        if let Err(mark_err) = outbox.mark_failed(job.id, &reason).await {
                            let msg = mark_err.to_string();
                            warn!(job_id = %job.id, error = %msg, "mark_failed failed");
                            fatal_errors
                                .push(format!("mark_failed error for {}: {}", job.id, msg));
                        }
                        failed = failed.saturating_add(1);
                    } else {
                        let delay_ms = calculate_backoff(job.attempts);
                        let next_attempt_at =
                            Utc::now() + ChronoDuration::milliseconds(delay_ms as i64);
                        debug!(
                            job_id = %job.id,
                            attempts = job.attempts,
                            delay_ms,
                            "Rescheduling sync job"
                        );
                        if let Err(mark_err) =
                            outbox.reschedule(job.id, &reason, next_attempt_at).await
                        {
                            let msg = mark_err.to_string();
                            warn!(job_id = %job.id, error = %msg, "reschedule failed");
                            fatal_errors
                                .push(format!("reschedule error for {}: {}", job.id, msg));
                        }
                        rescheduled = rescheduled.saturating_add(1);
                    }
                }
            }
        }

        debug!(sent, rescheduled, failed, "Outbox batch completed");

        if !fatal_errors.is_empty() {
            return Err(fatal_errors.join("; "));
        }

        Ok(())
    }
}

/// Exponential backoff delay with jitter, in milliseconds.
pub fn calculate_backoff(attempt: u32) -> u64 {
    let base_delay = 1000u64; // 1 second in milliseconds
    let max_delay = 32000u64; // 32 seconds max

    let delay = base_delay * 2u64.pow(attempt.min(5));
    let capped_delay = delay.min(max_delay);

    // Add ±25% jitter
    use rand::Rng;
    let jitter_range = (capped_delay as f64 * 0.25) as u64;
    let mut rng = rand::thread_rng();
    let jitter = rng.gen_range(0..=jitter_range * 2) as i64 - jitter_range as i64;

    (capped_delay as i64 + jitter).max(0) as u64
}

fn truncate_reason(reason: &str) -> String {
    if reason.len() <= MAX_ERROR_REASON_LENGTH {
        return reason.to_string();
    }

    let mut truncated =
        reason.chars().take(MAX_ERROR_REASON_LENGTH.saturating_sub(3)).collect::<String>();
    truncated.push_str("...");
    truncated
}

impl Drop for OutboxWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("OutboxWorker dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use agendapro_domain::{
        AgendaError, Result as DomainResult, SyncJob, SyncJobStatus, SyncOperation,
    };
    use async_trait::async_trait;
    use chrono::DateTime;
    use tokio::sync::Mutex as TokioMutex;
    use uuid::Uuid;

    use super::*;

    type JobStore = TokioMutex<Vec<SyncJob>>;
    type SentStore = TokioMutex<Vec<Uuid>>;
    type FailedStore = TokioMutex<Vec<(Uuid, String)>>;
    type RescheduleStore = TokioMutex<Vec<(Uuid, String, DateTime<Utc>)>>;
    type ResponseQueue = TokioMutex<Vec<DomainResult<()>>>;

    fn sample_job(attempts: u32) -> SyncJob {
        let mut job =
            SyncJob::new(Uuid::new_v4(), Uuid::new_v4(), SyncOperation::Create, None);
        job.attempts = attempts;
        job
    }

    struct MockOutbox {
        jobs: JobStore,
        sent: SentStore,
        failed: FailedStore,
        rescheduled: RescheduleStore,
        fail_mark_sent: bool,
    }

    impl MockOutbox {
        fn new(jobs: Vec<SyncJob>) -> Self {
            Self {
                jobs: TokioMutex::new(jobs),
                sent: TokioMutex::new(Vec::new()),
                failed: TokioMutex::new(Vec::new()),
                rescheduled: TokioMutex::new(Vec::new()),
                fail_mark_sent: false,
            }
        }

        fn with_fail_mark_sent(mut self) -> Self {
            self.fail_mark_sent = true;
            self
        }

        async fn sent_jobs(&self) -> Vec<Uuid> {
            self.sent.lock().await.clone()
        }

        async fn failed_jobs(&self) -> Vec<(Uuid, String)> {
            self.failed.lock().await.clone()
        }

        async fn rescheduled_jobs(&self) -> Vec<(Uuid, String, DateTime<Utc>)> {
            self.rescheduled.lock().await.clone()
        }
    }

    #[async_trait]
    impl OutboxQueue for MockOutbox {
        async fn enqueue(&self, job: &SyncJob) -> DomainResult<()> {
            self.jobs.lock().await.push(job.clone());
            Ok(())
        }

        async fn dequeue_batch(&self, limit: usize) -> DomainResult<Vec<SyncJob>> {
            let mut jobs = self.jobs.lock().await;
            let batch_len = limit.min(jobs.len());
            let mut batch: Vec<SyncJob> = jobs.drain(..batch_len).collect();
            // Honor the claim contract: processing status, attempts bumped.
            for job in &mut batch {
                job.status = SyncJobStatus::Processing;
                job.attempts += 1;
            }
            Ok(batch)
        }

        async fn mark_sent(&self, id: Uuid) -> DomainResult<()> {
            if self.fail_mark_sent {
                return Err(AgendaError::Internal("mark_sent failure".into()));
            }
            self.sent.lock().await.push(id);
            Ok(())
        }

        async fn mark_failed(&self, id: Uuid, error: &str) -> DomainResult<()> {
            self.failed.lock().await.push((id, error.to_string()));
            Ok(())
        }

        async fn reschedule(
            &self,
            id: Uuid,
            error: &str,
            next_attempt_at: DateTime<Utc>,
        ) -> DomainResult<()> {
            self.rescheduled.lock().await.push((id, error.to_string(), next_attempt_at));
            Ok(())
        }
    }

    struct MockHandler {
        responses: ResponseQueue,
        calls: TokioMutex<u32>,
    }

    impl MockHandler {
        fn new(responses: Vec<DomainResult<()>>) -> Self {
            Self { responses: TokioMutex::new(responses), calls: TokioMutex::new(0) }
        }

        async fn call_count(&self) -> u32 {
            *self.calls.lock().await
        }
    }

    #[async_trait]
    impl SyncJobHandler for MockHandler {
        async fn handle(&self, _job: &SyncJob) -> DomainResult<()> {
            *self.calls.lock().await += 1;
            let mut responses = self.responses.lock().await;
            if responses.is_empty() {
                Ok(())
            } else {
                responses.remove(0)
            }
        }
    }

    #[tokio::test]
    async fn process_batch_marks_sent_on_success() {
        let job = sample_job(0);
        let job_id = job.id;
        let outbox = Arc::new(MockOutbox::new(vec![job]));
        let outbox_trait: Arc<dyn OutboxQueue> = outbox.clone();
        let handler = Arc::new(MockHandler::new(vec![Ok(())]));
        let handler_trait: Arc<dyn SyncJobHandler> = handler.clone();

        let result = OutboxWorker::process_batch(&outbox_trait, &handler_trait, 10, 3).await;
        assert!(result.is_ok());

        assert_eq!(outbox.sent_jobs().await, vec![job_id]);
        assert!(outbox.failed_jobs().await.is_empty());
        assert!(outbox.rescheduled_jobs().await.is_empty());
        assert_eq!(handler.call_count().await, 1);
    }

    #[tokio::test]
    async fn process_batch_reschedules_failures_with_backoff() {
        let job = sample_job(0);
        let job_id = job.id;
        let outbox = Arc::new(MockOutbox::new(vec![job]));
        let outbox_trait: Arc<dyn OutboxQueue> = outbox.clone();
        let handler = Arc::new(MockHandler::new(vec![Err(AgendaError::ExternalService(
            "calendar boom".into(),
        ))]));
        let handler_trait: Arc<dyn SyncJobHandler> = handler.clone();

        let before = Utc::now();
        let result = OutboxWorker::process_batch(&outbox_trait, &handler_trait, 10, 3).await;
        assert!(result.is_ok());

        let rescheduled = outbox.rescheduled_jobs().await;
        assert_eq!(rescheduled.len(), 1);
        assert_eq!(rescheduled[0].0, job_id);
        assert!(rescheduled[0].1.contains("calendar boom"));
        assert!(rescheduled[0].2 > before);
        assert!(outbox.failed_jobs().await.is_empty());
        assert!(outbox.sent_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn process_batch_fails_job_after_attempt_budget() {
        // Two prior attempts recorded; the claim bumps to three, matching
        // the budget, so this failure is final.
        let job = sample_job(2);
        let job_id = job.id;
        let outbox = Arc::new(MockOutbox::new(vec![job]));
        let outbox_trait: Arc<dyn OutboxQueue> = outbox.clone();
        let handler = Arc::new(MockHandler::new(vec![Err(AgendaError::ExternalService(
            "still broken".into(),
        ))]));
        let handler_trait: Arc<dyn SyncJobHandler> = handler.clone();

        let result = OutboxWorker::process_batch(&outbox_trait, &handler_trait, 10, 3).await;
        assert!(result.is_ok());

        let failed = outbox.failed_jobs().await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, job_id);
        assert!(failed[0].1.contains("still broken"));
        assert!(outbox.rescheduled_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn process_batch_propagates_mark_sent_failures() {
        let outbox = Arc::new(MockOutbox::new(vec![sample_job(0)]).with_fail_mark_sent());
        let outbox_trait: Arc<dyn OutboxQueue> = outbox.clone();
        let handler = Arc::new(MockHandler::new(vec![Ok(())]));
        let handler_trait: Arc<dyn SyncJobHandler> = handler.clone();

        let result = OutboxWorker::process_batch(&outbox_trait, &handler_trait, 10, 3).await;
        assert!(result.is_err());
        assert!(outbox.sent_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn worker_lifecycle() {
        let outbox = Arc::new(MockOutbox::new(Vec::new()));
        let outbox_trait: Arc<dyn OutboxQueue> = outbox.clone();
        let handler = Arc::new(MockHandler::new(Vec::new()));
        let handler_trait: Arc<dyn SyncJobHandler> = handler.clone();

        let mut worker =
            OutboxWorker::new(outbox_trait, handler_trait, OutboxWorkerConfig::default());

        assert!(!worker.is_running());

        worker.start().await.unwrap();
        assert!(worker.is_running());

        let second = worker.start().await;
        assert!(second.is_err());

        worker.stop().await.unwrap();
        assert!(!worker.is_running());

        let stopped_again = worker.stop().await;
        assert!(stopped_again.is_err());
    }

    #[test]
    fn backoff_grows_and_stays_capped() {
        // First retry lands near one doubling of the base delay.
        let first = calculate_backoff(1);
        assert!((1500..=2500).contains(&first), "unexpected first delay {first}");

        // Far attempts stay inside the cap plus jitter.
        for attempt in 5..12 {
            let delay = calculate_backoff(attempt);
            assert!(delay <= 40_000, "delay {delay} beyond cap for attempt {attempt}");
        }
    }

    #[test]
    fn truncate_reason_bounds_long_errors() {
        let long = "x".repeat(MAX_ERROR_REASON_LENGTH * 2);
        let truncated = truncate_reason(&long);
        assert_eq!(truncated.len(), MAX_ERROR_REASON_LENGTH);
        assert!(truncated.ends_with("..."));

        let short = "fits";
        assert_eq!(truncate_reason(short), "fits");
    }
}
