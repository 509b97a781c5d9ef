//! A named queue: one task body, one concurrency ceiling, one worker loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{Notify, Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use talentflow_core::RetryPolicy;

use super::observer::{QueueObserver, TracingObserver};
use super::store::{JobStore, JobStoreError};
use super::task::TaskBody;
use super::types::{
    DEFAULT_MAX_ATTEMPTS, EnqueueOptions, FailureOutcome, Job, JobId, JobPayload, JobStatus, QueueName, QueueSnapshot,
};

/// Per-queue runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum task bodies running at once
    pub concurrency: usize,
    /// Upper bound on how long an idle worker sleeps before polling again
    pub poll_interval: Duration,
    /// Backoff schedule between attempts
    pub backoff: RetryPolicy,
    /// Attempt budget for jobs enqueued without one
    pub max_attempts: u32,
    /// Completed jobs kept for inspection
    pub retain_completed: usize,
    /// Failed jobs kept for inspection
    pub retain_failed: usize,
}

impl QueueConfig {
    pub fn for_queue(queue: QueueName) -> Self {
        Self {
            concurrency: queue.default_concurrency(),
            poll_interval: Duration::from_millis(250),
            backoff: RetryPolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retain_completed: 100,
            retain_failed: 500,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: RetryPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retention(mut self, completed: usize, failed: usize) -> Self {
        self.retain_completed = completed;
        self.retain_failed = failed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobQueueError {
    #[error("payload for queue {payload} enqueued on queue {queue}")]
    PayloadMismatch { queue: QueueName, payload: QueueName },
    #[error("no queue registered under {0}")]
    UnknownQueue(QueueName),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {id} cannot be removed while {status:?}")]
    NotRemovable { id: JobId, status: JobStatus },
    #[error("job {id} is {status:?}, only failed jobs can be retried")]
    NotRetryable { id: JobId, status: JobStatus },
    #[error("queue {0} is already running")]
    AlreadyRunning(QueueName),
    #[error(transparent)]
    Store(JobStoreError),
}

impl From<JobStoreError> for JobQueueError {
    fn from(err: JobStoreError) -> Self {
        match err {
            JobStoreError::NotFound(id) => JobQueueError::NotFound(id),
            JobStoreError::NotRemovable { id, status } => JobQueueError::NotRemovable { id, status },
            other => JobQueueError::Store(other),
        }
    }
}

/// A named queue bound to its store, task body and observer.
pub struct JobQueue {
    name: QueueName,
    config: QueueConfig,
    store: Arc<dyn JobStore>,
    body: Arc<dyn TaskBody>,
    observer: Arc<dyn QueueObserver>,
    permits: Arc<Semaphore>,
    wake: Notify,
    running: AtomicBool,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl JobQueue {
    pub fn new(name: QueueName, config: QueueConfig, store: Arc<dyn JobStore>, body: Arc<dyn TaskBody>) -> Self {
        let concurrency = config.concurrency.max(1);
        Self {
            name,
            config,
            store,
            body,
            observer: Arc::new(TracingObserver),
            permits: Arc::new(Semaphore::new(concurrency)),
            wake: Notify::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueueObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn name(&self) -> QueueName {
        self.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Add a job. Enqueueing an id that already exists returns the stored job.
    pub async fn enqueue(&self, payload: JobPayload, mut options: EnqueueOptions) -> Result<Job, JobQueueError> {
        if payload.queue_name() != self.name {
            return Err(JobQueueError::PayloadMismatch {
                queue: self.name,
                payload: payload.queue_name(),
            });
        }

        options.max_attempts.get_or_insert(self.config.max_attempts);
        let (job, inserted) = self.store.insert(Job::new(payload, &options)).await?;
        if inserted {
            self.observer.on_enqueued(&job);
            self.wake.notify_one();
        } else {
            debug!(queue = %self.name, job_id = %job.id, "duplicate enqueue ignored");
        }
        Ok(job)
    }

    pub async fn get_status(&self) -> Result<QueueSnapshot, JobQueueError> {
        Ok(self.store.snapshot(self.name).await?)
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Option<Job>, JobQueueError> {
        Ok(self.store.get(self.name, id).await?)
    }

    pub async fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, JobQueueError> {
        Ok(self.store.list(self.name, status, limit).await?)
    }

    /// Cancel a job that has not started yet.
    pub async fn remove(&self, id: &JobId) -> Result<Job, JobQueueError> {
        let job = self.store.remove_waiting(self.name, id).await?;
        info!(queue = %self.name, job_id = %id, "job removed");
        Ok(job)
    }

    /// Move a failed job back to pending with a fresh attempt budget.
    pub async fn retry_failed(&self, id: &JobId) -> Result<Job, JobQueueError> {
        let mut job = self
            .store
            .get(self.name, id)
            .await?
            .ok_or_else(|| JobQueueError::NotFound(id.clone()))?;

        if job.status != JobStatus::Failed {
            return Err(JobQueueError::NotRetryable { id: id.clone(), status: job.status });
        }

        job.reset_for_retry();
        self.store.update(&job).await?;
        info!(queue = %self.name, job_id = %id, "failed job requeued");
        self.wake.notify_one();
        Ok(job)
    }

    /// Spawn the worker loop. A queue runs at most one loop at a time.
    pub fn start(self: &Arc<Self>) -> Result<QueueWorkerHandle, JobQueueError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(JobQueueError::AlreadyRunning(self.name));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let queue = Arc::clone(self);
        let join = tokio::spawn(async move {
            queue.clone().run(shutdown_rx).await;
            queue.running.store(false, Ordering::SeqCst);
        });

        Ok(QueueWorkerHandle {
            queue: self.name,
            shutdown: shutdown_tx,
            join,
        })
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(queue = %self.name, concurrency = self.config.concurrency, "queue worker started");

        match self.store.requeue_stalled(self.name).await {
            Ok(0) => {}
            Ok(n) => warn!(queue = %self.name, jobs = n, "requeued stalled jobs"),
            Err(e) => error!(queue = %self.name, error = %e, "failed to requeue stalled jobs"),
        }

        let mut in_flight = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Hold a permit before claiming so the ceiling covers claimed jobs too.
            let permit = tokio::select! {
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            };

            match self.store.claim_next(self.name, Utc::now()).await {
                Ok(Some(job)) => {
                    debug!(queue = %self.name, job_id = %job.id, attempt = job.attempt, "claimed job");
                    let queue = Arc::clone(&self);
                    in_flight.spawn(async move {
                        let _permit = permit;
                        queue.execute(job).await;
                    });
                }
                Ok(None) => {
                    drop(permit);
                    let wait = self.idle_wait().await;
                    tokio::select! {
                        _ = self.wake.notified() => {}
                        _ = tokio::time::sleep(wait) => {}
                        _ = shutdown.changed() => break,
                    }
                }
                Err(e) => {
                    drop(permit);
                    error!(queue = %self.name, error = %e, "failed to claim job");
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }

            while let Some(done) = in_flight.try_join_next() {
                if let Err(e) = done {
                    error!(queue = %self.name, error = %e, "job task aborted");
                }
            }
        }

        // Active task bodies run to completion.
        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                error!(queue = %self.name, error = %e, "job task aborted");
            }
        }

        info!(queue = %self.name, "queue worker stopped");
    }

    /// Time until the next delayed job is due, bounded by the poll interval.
    async fn idle_wait(&self) -> Duration {
        let poll = self.config.poll_interval;
        match self.store.next_scheduled(self.name).await {
            Ok(Some(at)) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO).min(poll),
            _ => poll,
        }
    }

    async fn execute(&self, mut job: Job) {
        let started = job.started_at.unwrap_or_else(Utc::now);

        let result = match AssertUnwindSafe(self.body.run(&job)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("task body panicked")),
        };

        match result {
            Ok(value) => {
                job.mark_completed(value, started);
                self.persist(&job).await;
                self.observer.on_completed(&job);
                self.prune(JobStatus::Completed, self.config.retain_completed).await;
            }
            Err(err) => {
                let message = format!("{err:#}");
                let outcome = job.mark_failed(message.clone(), started, &self.config.backoff);
                self.persist(&job).await;

                let exhausted = outcome == FailureOutcome::Exhausted;
                self.observer.on_failed(&job, &message, exhausted);
                if exhausted {
                    self.prune(JobStatus::Failed, self.config.retain_failed).await;
                }
            }
        }

        self.wake.notify_one();
    }

    async fn persist(&self, job: &Job) {
        if let Err(e) = self.store.update(job).await {
            error!(queue = %self.name, job_id = %job.id, error = %e, "failed to persist job state");
        }
    }

    async fn prune(&self, status: JobStatus, keep: usize) {
        match self.store.prune(self.name, status, keep).await {
            Ok(0) => {}
            Ok(n) => debug!(queue = %self.name, status = ?status, evicted = n, "evicted retained jobs"),
            Err(e) => warn!(queue = %self.name, error = %e, "failed to evict retained jobs"),
        }
    }
}

/// Handle to a running queue worker.
#[derive(Debug)]
pub struct QueueWorkerHandle {
    queue: QueueName,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl QueueWorkerHandle {
    pub fn queue(&self) -> QueueName {
        self.queue
    }

    /// Stop claiming new jobs and wait for in-flight task bodies.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            error!(queue = %self.queue, error = %e, "queue worker ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::observer::{QueueEvent, RecordingObserver};
    use crate::jobs::store::InMemoryJobStore;
    use crate::jobs::task::task_fn;
    use crate::jobs::types::{CleanupPayload, IndexingPayload, NotificationPayload};
    use std::sync::atomic::{AtomicU32, AtomicUsize};

    fn notification(n: usize) -> JobPayload {
        JobPayload::Notification(NotificationPayload {
            recipient: format!("user{n}@example.com"),
            subject: "Interview scheduled".into(),
            body: String::new(),
        })
    }

    fn fast_config(queue: QueueName) -> QueueConfig {
        QueueConfig::for_queue(queue)
            .with_poll_interval(Duration::from_millis(10))
            .with_backoff(RetryPolicy::exponential(3, Duration::from_millis(5), Duration::from_millis(20)))
    }

    async fn wait_until<F, Fut>(mut done: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn rejects_payload_for_another_queue() {
        let queue = JobQueue::new(
            QueueName::Indexing,
            fast_config(QueueName::Indexing),
            InMemoryJobStore::arc(),
            task_fn(|_| async { Ok(serde_json::Value::Null) }),
        );

        let err = queue.enqueue(notification(1), EnqueueOptions::default()).await.unwrap_err();
        assert_eq!(
            err,
            JobQueueError::PayloadMismatch { queue: QueueName::Indexing, payload: QueueName::Notification }
        );
    }

    #[tokio::test]
    async fn queue_budget_applies_unless_the_job_sets_one() {
        let queue = JobQueue::new(
            QueueName::Notification,
            fast_config(QueueName::Notification).with_max_attempts(5),
            InMemoryJobStore::arc(),
            task_fn(|_| async { Ok(serde_json::Value::Null) }),
        );

        let defaulted = queue.enqueue(notification(1), EnqueueOptions::default()).await.unwrap();
        let explicit = queue
            .enqueue(notification(2), EnqueueOptions::default().with_max_attempts(2))
            .await
            .unwrap();

        assert_eq!(defaulted.max_attempts, 5);
        assert_eq!(explicit.max_attempts, 2);
    }

    #[tokio::test]
    async fn completed_job_keeps_return_value() {
        let observer = Arc::new(RecordingObserver::new());
        let queue = Arc::new(
            JobQueue::new(
                QueueName::Indexing,
                fast_config(QueueName::Indexing),
                InMemoryJobStore::arc(),
                task_fn(|job| async move {
                    match job.payload {
                        JobPayload::Indexing(p) => Ok(serde_json::json!({ "indexed": p.entity_id })),
                        _ => anyhow::bail!("unexpected payload"),
                    }
                }),
            )
            .with_observer(observer.clone()),
        );

        let job = queue
            .enqueue(
                JobPayload::Indexing(IndexingPayload { entity: "candidate".into(), entity_id: "c-1".into() }),
                EnqueueOptions::default(),
            )
            .await
            .unwrap();
        let handle = queue.start().unwrap();

        wait_until(|| async { queue.get_status().await.unwrap().completed == 1 }).await;
        handle.shutdown().await;

        let stored = queue.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.attempt, 1);
        assert_eq!(stored.return_value, Some(serde_json::json!({ "indexed": "c-1" })));
        assert_eq!(
            observer.events(),
            vec![
                QueueEvent::Enqueued { queue: QueueName::Indexing, id: job.id.clone() },
                QueueEvent::Completed { queue: QueueName::Indexing, id: job.id.clone(), attempt: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn failing_job_exhausts_attempts_then_fails() {
        let calls = Arc::new(AtomicU32::new(0));
        let observer = Arc::new(RecordingObserver::new());
        let counter = calls.clone();
        let queue = Arc::new(
            JobQueue::new(
                QueueName::Cleanup,
                fast_config(QueueName::Cleanup),
                InMemoryJobStore::arc(),
                task_fn(move |_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        anyhow::bail!("disk unavailable")
                    }
                }),
            )
            .with_observer(observer.clone()),
        );

        let job = queue
            .enqueue(
                JobPayload::Cleanup(CleanupPayload { older_than_days: 30 }),
                EnqueueOptions::default().with_max_attempts(3),
            )
            .await
            .unwrap();
        let handle = queue.start().unwrap();

        wait_until(|| async { queue.get_status().await.unwrap().failed == 1 }).await;
        handle.shutdown().await;

        let stored = queue.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.attempt, 3);
        assert!(stored.attempt <= stored.max_attempts);
        assert_eq!(stored.last_error.as_deref(), Some("disk unavailable"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let exhausted: Vec<bool> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                QueueEvent::Failed { exhausted, .. } => Some(exhausted),
                _ => None,
            })
            .collect();
        assert_eq!(exhausted, vec![false, false, true]);
    }

    #[tokio::test]
    async fn transient_failure_recovers_on_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let queue = Arc::new(JobQueue::new(
            QueueName::Cleanup,
            fast_config(QueueName::Cleanup),
            InMemoryJobStore::arc(),
            task_fn(move |_| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("first attempt fails");
                    }
                    Ok(serde_json::json!("ok"))
                }
            }),
        ));

        let job = queue
            .enqueue(JobPayload::Cleanup(CleanupPayload { older_than_days: 1 }), EnqueueOptions::default())
            .await
            .unwrap();
        let handle = queue.start().unwrap();

        wait_until(|| async { queue.get_status().await.unwrap().completed == 1 }).await;
        handle.shutdown().await;

        let stored = queue.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.attempt, 2);
        assert_eq!(stored.last_error.as_deref(), Some("first attempt fails"));
        assert_eq!(stored.history.len(), 2);
    }

    #[tokio::test]
    async fn burst_never_exceeds_concurrency() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (active.clone(), peak.clone());

        let queue = Arc::new(JobQueue::new(
            QueueName::Notification,
            fast_config(QueueName::Notification).with_concurrency(3),
            InMemoryJobStore::arc(),
            task_fn(move |_| {
                let (active, peak) = (a.clone(), p.clone());
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(serde_json::Value::Null)
                }
            }),
        ));

        for n in 0..12 {
            queue.enqueue(notification(n), EnqueueOptions::default()).await.unwrap();
        }
        let handle = queue.start().unwrap();

        wait_until(|| async { queue.get_status().await.unwrap().completed == 12 }).await;
        handle.shutdown().await;

        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak} exceeded ceiling");
        assert!(peak >= 2, "jobs never overlapped");
    }

    #[tokio::test]
    async fn pending_job_can_be_removed_before_start() {
        let queue = JobQueue::new(
            QueueName::Notification,
            fast_config(QueueName::Notification),
            InMemoryJobStore::arc(),
            task_fn(|_| async { Ok(serde_json::Value::Null) }),
        );

        let job = queue.enqueue(notification(1), EnqueueOptions::default()).await.unwrap();
        let removed = queue.remove(&job.id).await.unwrap();
        assert_eq!(removed.id, job.id);
        assert!(queue.get_job(&job.id).await.unwrap().is_none());
        assert_eq!(queue.get_status().await.unwrap(), QueueSnapshot::default());

        let err = queue.remove(&job.id).await.unwrap_err();
        assert_eq!(err, JobQueueError::NotFound(job.id));
    }

    #[tokio::test]
    async fn failed_job_can_be_retried_manually() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let queue = Arc::new(JobQueue::new(
            QueueName::Cleanup,
            fast_config(QueueName::Cleanup),
            InMemoryJobStore::arc(),
            task_fn(move |_| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("storage offline");
                    }
                    Ok(serde_json::Value::Null)
                }
            }),
        ));

        let job = queue
            .enqueue(
                JobPayload::Cleanup(CleanupPayload { older_than_days: 1 }),
                EnqueueOptions::default().with_max_attempts(1),
            )
            .await
            .unwrap();
        let handle = queue.start().unwrap();
        wait_until(|| async { queue.get_status().await.unwrap().failed == 1 }).await;

        let requeued = queue.retry_failed(&job.id).await.unwrap();
        assert_eq!(requeued.status, JobStatus::Pending);
        assert_eq!(requeued.attempt, 0);

        wait_until(|| async { queue.get_status().await.unwrap().completed == 1 }).await;
        handle.shutdown().await;

        let err = queue.retry_failed(&job.id).await.unwrap_err();
        assert!(matches!(err, JobQueueError::NotRetryable { status: JobStatus::Completed, .. }));
    }

    #[tokio::test]
    async fn retention_evicts_oldest_completed_jobs() {
        let queue = Arc::new(JobQueue::new(
            QueueName::Cleanup,
            fast_config(QueueName::Cleanup).with_retention(2, 2),
            InMemoryJobStore::arc(),
            task_fn(|_| async { Ok(serde_json::Value::Null) }),
        ));

        let mut ids = Vec::new();
        for days in 0..5 {
            let job = queue
                .enqueue(JobPayload::Cleanup(CleanupPayload { older_than_days: days }), EnqueueOptions::default())
                .await
                .unwrap();
            ids.push(job.id);
        }
        let handle = queue.start().unwrap();

        // Cleanup runs one job at a time, so completion order is enqueue order.
        wait_until(|| async {
            let status = queue.get_status().await.unwrap();
            status.backlog() == 0 && status.completed == 2
        })
        .await;
        handle.shutdown().await;

        assert!(queue.get_job(&ids[0]).await.unwrap().is_none());
        assert!(queue.get_job(&ids[4]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn queue_cannot_start_twice() {
        let queue = Arc::new(JobQueue::new(
            QueueName::Cleanup,
            fast_config(QueueName::Cleanup),
            InMemoryJobStore::arc(),
            task_fn(|_| async { Ok(serde_json::Value::Null) }),
        ));

        let handle = queue.start().unwrap();
        assert_eq!(queue.start().unwrap_err(), JobQueueError::AlreadyRunning(QueueName::Cleanup));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight_jobs() {
        let queue = Arc::new(JobQueue::new(
            QueueName::Cleanup,
            fast_config(QueueName::Cleanup),
            InMemoryJobStore::arc(),
            task_fn(|_| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(serde_json::Value::Null)
            }),
        ));

        let job = queue
            .enqueue(JobPayload::Cleanup(CleanupPayload { older_than_days: 1 }), EnqueueOptions::default())
            .await
            .unwrap();
        let handle = queue.start().unwrap();
        wait_until(|| async { queue.get_status().await.unwrap().active == 1 }).await;

        handle.shutdown().await;
        let stored = queue.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
    }
}
