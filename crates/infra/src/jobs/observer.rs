//! Lifecycle hooks fired by queues.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::types::{Job, JobId, QueueName};

/// Observes job lifecycle transitions. Hooks run inline on the worker, so
/// implementations should return quickly.
pub trait QueueObserver: Send + Sync {
    fn on_enqueued(&self, _job: &Job) {}

    /// `exhausted` is true when no attempts remain and the job is now failed.
    fn on_failed(&self, _job: &Job, _error: &str, _exhausted: bool) {}

    fn on_completed(&self, _job: &Job) {}
}

/// Logs every transition through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl QueueObserver for TracingObserver {
    fn on_enqueued(&self, job: &Job) {
        debug!(queue = %job.queue, job_id = %job.id, priority = job.priority, "job enqueued");
    }

    fn on_failed(&self, job: &Job, error: &str, exhausted: bool) {
        if exhausted {
            warn!(
                queue = %job.queue,
                job_id = %job.id,
                attempts = job.attempt,
                error = %error,
                "job failed permanently"
            );
        } else {
            debug!(
                queue = %job.queue,
                job_id = %job.id,
                attempt = job.attempt,
                max_attempts = job.max_attempts,
                error = %error,
                "job attempt failed, retrying"
            );
        }
    }

    fn on_completed(&self, job: &Job) {
        info!(queue = %job.queue, job_id = %job.id, attempts = job.attempt, "job completed");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Enqueued { queue: QueueName, id: JobId },
    Failed { queue: QueueName, id: JobId, attempt: u32, exhausted: bool },
    Completed { queue: QueueName, id: JobId, attempt: u32 },
}

/// Keeps every event in memory. Useful in tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, event: QueueEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl QueueObserver for RecordingObserver {
    fn on_enqueued(&self, job: &Job) {
        self.push(QueueEvent::Enqueued { queue: job.queue, id: job.id.clone() });
    }

    fn on_failed(&self, job: &Job, _error: &str, exhausted: bool) {
        self.push(QueueEvent::Failed {
            queue: job.queue,
            id: job.id.clone(),
            attempt: job.attempt,
            exhausted,
        });
    }

    fn on_completed(&self, job: &Job) {
        self.push(QueueEvent::Completed { queue: job.queue, id: job.id.clone(), attempt: job.attempt });
    }
}
