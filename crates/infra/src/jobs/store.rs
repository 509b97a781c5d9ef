//! Job storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{Job, JobId, JobStatus, QueueName, QueueSnapshot};

/// Job store abstraction.
///
/// Implementations must make `claim_next` atomic: a job is handed to at most
/// one caller per transition out of pending/delayed.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a job unless one with the same id already exists in its queue.
    /// Returns the stored job and whether it was newly inserted.
    async fn insert(&self, job: Job) -> Result<(Job, bool), JobStoreError>;

    async fn get(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobStoreError>;

    async fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Claim the lowest-priority-value ready job, marking it active.
    async fn claim_next(&self, queue: QueueName, now: DateTime<Utc>) -> Result<Option<Job>, JobStoreError>;

    /// Remove a pending or delayed job.
    async fn remove_waiting(&self, queue: QueueName, id: &JobId) -> Result<Job, JobStoreError>;

    /// List jobs, optionally filtered by status, oldest first.
    async fn list(&self, queue: QueueName, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, JobStoreError>;

    async fn snapshot(&self, queue: QueueName) -> Result<QueueSnapshot, JobStoreError>;

    /// Earliest scheduled time among delayed jobs.
    async fn next_scheduled(&self, queue: QueueName) -> Result<Option<DateTime<Utc>>, JobStoreError>;

    /// Keep only the `keep` most recently finished jobs with `status`.
    async fn prune(&self, queue: QueueName, status: JobStatus, keep: usize) -> Result<usize, JobStoreError>;

    /// Return active jobs left behind by a stopped worker to pending,
    /// without counting the interrupted attempt.
    async fn requeue_stalled(&self, queue: QueueName) -> Result<usize, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {id} cannot be removed while {status:?}")]
    NotRemovable { id: JobId, status: JobStatus },
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Default)]
struct QueueJobs {
    jobs: HashMap<JobId, Job>,
    next_sequence: u64,
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    queues: RwLock<HashMap<QueueName, QueueJobs>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<QueueName, QueueJobs>>, JobStoreError> {
        self.queues
            .read()
            .map_err(|_| JobStoreError::Storage("job store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<QueueName, QueueJobs>>, JobStoreError> {
        self.queues
            .write()
            .map_err(|_| JobStoreError::Storage("job store lock poisoned".into()))
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, mut job: Job) -> Result<(Job, bool), JobStoreError> {
        let mut queues = self.write()?;
        let queue = queues.entry(job.queue).or_default();
        if let Some(existing) = queue.jobs.get(&job.id) {
            return Ok((existing.clone(), false));
        }
        queue.next_sequence += 1;
        job.sequence = queue.next_sequence;
        queue.jobs.insert(job.id.clone(), job.clone());
        Ok((job, true))
    }

    async fn get(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobStoreError> {
        let queues = self.read()?;
        Ok(queues.get(&queue).and_then(|q| q.jobs.get(id)).cloned())
    }

    async fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut queues = self.write()?;
        match queues.get_mut(&job.queue).and_then(|q| q.jobs.get_mut(&job.id)) {
            Some(stored) => {
                *stored = job.clone();
                Ok(())
            }
            None => Err(JobStoreError::NotFound(job.id.clone())),
        }
    }

    async fn claim_next(&self, queue: QueueName, now: DateTime<Utc>) -> Result<Option<Job>, JobStoreError> {
        let mut queues = self.write()?;
        let Some(queue) = queues.get_mut(&queue) else {
            return Ok(None);
        };

        let next = queue
            .jobs
            .values()
            .filter(|j| j.is_ready(now))
            .min_by_key(|j| (j.priority, j.sequence))
            .map(|j| j.id.clone());

        Ok(next.and_then(|id| {
            queue.jobs.get_mut(&id).map(|job| {
                job.mark_active(now);
                job.clone()
            })
        }))
    }

    async fn remove_waiting(&self, queue: QueueName, id: &JobId) -> Result<Job, JobStoreError> {
        let mut queues = self.write()?;
        let jobs = &mut queues.entry(queue).or_default().jobs;
        match jobs.get(id).map(|j| j.status) {
            None => Err(JobStoreError::NotFound(id.clone())),
            Some(status) if !status.is_waiting() => Err(JobStoreError::NotRemovable { id: id.clone(), status }),
            Some(_) => jobs.remove(id).ok_or_else(|| JobStoreError::NotFound(id.clone())),
        }
    }

    async fn list(&self, queue: QueueName, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        let queues = self.read()?;
        let mut result: Vec<_> = queues
            .get(&queue)
            .map(|q| {
                q.jobs
                    .values()
                    .filter(|j| status.is_none_or(|s| j.status == s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        result.sort_by_key(|j| j.sequence);
        result.truncate(limit);
        Ok(result)
    }

    async fn snapshot(&self, queue: QueueName) -> Result<QueueSnapshot, JobStoreError> {
        let queues = self.read()?;
        let mut snapshot = QueueSnapshot::default();
        if let Some(q) = queues.get(&queue) {
            q.jobs.values().for_each(|j| snapshot.count(j.status));
        }
        Ok(snapshot)
    }

    async fn next_scheduled(&self, queue: QueueName) -> Result<Option<DateTime<Utc>>, JobStoreError> {
        let queues = self.read()?;
        Ok(queues.get(&queue).and_then(|q| {
            q.jobs
                .values()
                .filter(|j| j.status == JobStatus::Delayed)
                .filter_map(|j| j.scheduled_at)
                .min()
        }))
    }

    async fn prune(&self, queue: QueueName, status: JobStatus, keep: usize) -> Result<usize, JobStoreError> {
        let mut queues = self.write()?;
        let Some(q) = queues.get_mut(&queue) else {
            return Ok(0);
        };

        let mut finished: Vec<_> = q
            .jobs
            .values()
            .filter(|j| j.status == status)
            .map(|j| (j.completed_at, j.sequence, j.id.clone()))
            .collect();
        if finished.len() <= keep {
            return Ok(0);
        }

        // Oldest first; everything before the last `keep` goes.
        finished.sort();
        let evict = finished.len() - keep;
        for (_, _, id) in finished.into_iter().take(evict) {
            q.jobs.remove(&id);
        }
        Ok(evict)
    }

    async fn requeue_stalled(&self, queue: QueueName) -> Result<usize, JobStoreError> {
        let mut queues = self.write()?;
        let Some(q) = queues.get_mut(&queue) else {
            return Ok(0);
        };
        let mut count = 0;
        for job in q.jobs.values_mut().filter(|j| j.status == JobStatus::Active) {
            job.release_stalled();
            count += 1;
        }
        Ok(count)
    }
}
