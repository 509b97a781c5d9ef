//! Named, priority-ordered job queues with bounded concurrency.
//!
//! ## Design
//!
//! - One queue per [`QueueName`], each with exactly one [`TaskBody`]
//! - Typed payloads: a [`JobPayload`] variant only enqueues on its own queue
//! - Failed attempts are rescheduled on the shared backoff schedule until
//!   `max_attempts`, then the job is terminally failed
//! - Terminal jobs are retained up to a cap for inspection
//! - Lifecycle hooks go to a [`QueueObserver`]
//!
//! ## Components
//!
//! - `Job`: payload plus lifecycle bookkeeping
//! - `JobStore`: persistence for jobs (in-memory or durable)
//! - `JobQueue`: worker loop with a semaphore-bounded ceiling
//! - `QueueRegistry`: owns every queue, starts and stops them together

pub mod observer;
pub mod queue;
pub mod registry;
pub mod store;
pub mod task;
pub mod types;

pub use observer::{QueueEvent, QueueObserver, RecordingObserver, TracingObserver};
pub use queue::{JobQueue, JobQueueError, QueueConfig, QueueWorkerHandle};
pub use registry::{QueueRegistry, QueueRegistryBuilder};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use task::{TaskBody, task_fn};
pub use types::{
    CleanupPayload, DEFAULT_MAX_ATTEMPTS, EnqueueOptions, EnrichmentPayload, ExportPayload, FailureOutcome,
    IndexingPayload, Job, JobAttemptRecord, JobId, JobPayload, JobStatus, MatchingPayload, NotificationPayload,
    ParsingPayload, QueueName, QueueSnapshot, ReportingPayload, UnknownQueueName,
};
