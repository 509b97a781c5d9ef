//! Core job types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use talentflow_core::{CandidateId, JobContext, JobPostingId, RetryPolicy};

/// The fixed set of named queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    Enrichment,
    Notification,
    Parsing,
    Matching,
    Reporting,
    Export,
    Indexing,
    Cleanup,
}

impl QueueName {
    pub const ALL: [QueueName; 8] = [
        QueueName::Enrichment,
        QueueName::Notification,
        QueueName::Parsing,
        QueueName::Matching,
        QueueName::Reporting,
        QueueName::Export,
        QueueName::Indexing,
        QueueName::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Enrichment => "enrichment",
            QueueName::Notification => "notification",
            QueueName::Parsing => "parsing",
            QueueName::Matching => "matching",
            QueueName::Reporting => "reporting",
            QueueName::Export => "export",
            QueueName::Indexing => "indexing",
            QueueName::Cleanup => "cleanup",
        }
    }

    /// Per-queue concurrency ceiling used when nothing is configured.
    pub fn default_concurrency(&self) -> usize {
        match self {
            QueueName::Enrichment => 2,
            QueueName::Notification => 10,
            QueueName::Parsing => 3,
            QueueName::Matching => 5,
            QueueName::Reporting => 2,
            QueueName::Export => 2,
            QueueName::Indexing => 5,
            QueueName::Cleanup => 1,
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = UnknownQueueName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueName::ALL
            .into_iter()
            .find(|q| q.as_str() == s.trim())
            .ok_or_else(|| UnknownQueueName(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown queue name: {0}")]
pub struct UnknownQueueName(pub String);

/// Unique job identifier. Callers may supply their own for idempotent enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed
    Pending,
    /// Claimed by a worker
    Active,
    /// Finished successfully
    Completed,
    /// Exhausted its attempts
    Failed,
    /// Waiting for a scheduled time (initial delay or retry backoff)
    Delayed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Statuses a job may be removed from.
    pub fn is_waiting(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Delayed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentPayload {
    pub candidate_id: CandidateId,
    #[serde(default)]
    pub job: Option<JobContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub recipient: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsingPayload {
    pub document_id: String,
    #[serde(default)]
    pub candidate_id: Option<CandidateId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPayload {
    pub posting_id: JobPostingId,
    pub candidate_ids: Vec<CandidateId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingPayload {
    pub report: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub format: String,
    pub record_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingPayload {
    pub entity: String,
    pub entity_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupPayload {
    pub older_than_days: u32,
}

/// Typed job payload. Each variant belongs to exactly one queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "queue", content = "data", rename_all = "snake_case")]
pub enum JobPayload {
    Enrichment(EnrichmentPayload),
    Notification(NotificationPayload),
    Parsing(ParsingPayload),
    Matching(MatchingPayload),
    Reporting(ReportingPayload),
    Export(ExportPayload),
    Indexing(IndexingPayload),
    Cleanup(CleanupPayload),
}

impl JobPayload {
    pub fn queue_name(&self) -> QueueName {
        match self {
            JobPayload::Enrichment(_) => QueueName::Enrichment,
            JobPayload::Notification(_) => QueueName::Notification,
            JobPayload::Parsing(_) => QueueName::Parsing,
            JobPayload::Matching(_) => QueueName::Matching,
            JobPayload::Reporting(_) => QueueName::Reporting,
            JobPayload::Export(_) => QueueName::Export,
            JobPayload::Indexing(_) => QueueName::Indexing,
            JobPayload::Cleanup(_) => QueueName::Cleanup,
        }
    }
}

/// Attempt budget for jobs whose options and queue leave it unset.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Per-job options accepted by `enqueue`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Lower runs first
    pub priority: i32,
    /// Total attempts before the job is marked failed; the queue default when unset
    pub max_attempts: Option<u32>,
    /// Initial delay before the job becomes claimable
    pub delay: Option<Duration>,
    /// Caller-supplied id; enqueueing an existing id returns the existing job
    pub job_id: Option<JobId>,
}

impl EnqueueOptions {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_job_id(mut self, id: impl Into<JobId>) -> Self {
        self.job_id = Some(id.into());
        self
    }
}

/// Record of a job execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAttemptRecord {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A unit of background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub queue: QueueName,
    pub payload: JobPayload,
    pub status: JobStatus,
    /// Attempts started so far
    pub attempt: u32,
    pub max_attempts: u32,
    pub priority: i32,
    /// Insertion order, assigned by the store; breaks priority ties
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub return_value: Option<serde_json::Value>,
    pub history: Vec<JobAttemptRecord>,
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Rescheduled as delayed after the given backoff
    Retrying { delay: Duration },
    /// No attempts left; the job is failed
    Exhausted,
}

fn after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    now + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX)
}

impl Job {
    pub fn new(payload: JobPayload, options: &EnqueueOptions) -> Self {
        let now = Utc::now();
        let (status, scheduled_at) = match options.delay {
            Some(delay) if !delay.is_zero() => (JobStatus::Delayed, Some(after(now, delay))),
            _ => (JobStatus::Pending, None),
        };

        Self {
            id: options.job_id.clone().unwrap_or_default(),
            queue: payload.queue_name(),
            payload,
            status,
            attempt: 0,
            max_attempts: options.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
            priority: options.priority,
            sequence: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
            scheduled_at,
            last_error: None,
            return_value: None,
            history: Vec::new(),
        }
    }

    /// Whether a worker may claim this job at `now`.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.status.is_waiting() && self.scheduled_at.is_none_or(|at| at <= now)
    }

    pub fn mark_active(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Active;
        self.attempt += 1;
        self.started_at = Some(now);
        self.scheduled_at = None;
    }

    pub fn mark_completed(&mut self, value: serde_json::Value, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
        self.return_value = Some(value);
        self.record_attempt(started_at, now, None);
    }

    /// Record a failed attempt and either reschedule or exhaust the job.
    pub fn mark_failed(
        &mut self,
        error: String,
        started_at: DateTime<Utc>,
        backoff: &RetryPolicy,
    ) -> FailureOutcome {
        let now = Utc::now();
        self.record_attempt(started_at, now, Some(error.clone()));
        self.last_error = Some(error);

        if self.attempt < self.max_attempts {
            let delay = backoff.delay_for_attempt(self.attempt);
            self.status = JobStatus::Delayed;
            self.scheduled_at = Some(after(now, delay));
            FailureOutcome::Retrying { delay }
        } else {
            self.status = JobStatus::Failed;
            self.completed_at = Some(now);
            FailureOutcome::Exhausted
        }
    }

    /// Return a job whose worker stopped mid-attempt to pending. The
    /// interrupted attempt never finished, so it is not counted.
    pub fn release_stalled(&mut self) {
        self.status = JobStatus::Pending;
        self.attempt = self.attempt.saturating_sub(1);
        self.started_at = None;
    }

    /// Put a failed job back in line with a fresh attempt budget.
    pub fn reset_for_retry(&mut self) {
        self.status = JobStatus::Pending;
        self.attempt = 0;
        self.scheduled_at = None;
        self.completed_at = None;
        self.started_at = None;
    }

    fn record_attempt(&mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>, error: Option<String>) {
        self.history.push(JobAttemptRecord {
            attempt: self.attempt,
            started_at,
            finished_at,
            success: error.is_none(),
            error,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
        });
    }
}

/// Per-status job counts for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub pending: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub delayed: usize,
}

impl QueueSnapshot {
    pub fn count(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Active => self.active += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Delayed => self.delayed += 1,
        }
    }

    /// Jobs not yet in a terminal state.
    pub fn backlog(&self) -> usize {
        self.pending + self.active + self.delayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleanup() -> JobPayload {
        JobPayload::Cleanup(CleanupPayload { older_than_days: 30 })
    }

    fn fast_backoff() -> RetryPolicy {
        RetryPolicy::exponential(3, Duration::from_millis(100), Duration::from_secs(10))
    }

    #[test]
    fn queue_names_round_trip_through_strings() {
        for queue in QueueName::ALL {
            assert_eq!(queue.as_str().parse::<QueueName>().unwrap(), queue);
        }
        assert!("mailing".parse::<QueueName>().is_err());
    }

    #[test]
    fn payload_knows_its_queue() {
        let payload = JobPayload::Matching(MatchingPayload {
            posting_id: JobPostingId::new(),
            candidate_ids: vec![],
        });
        assert_eq!(payload.queue_name(), QueueName::Matching);
        assert_eq!(cleanup().queue_name(), QueueName::Cleanup);
    }

    #[test]
    fn delayed_job_is_not_ready_until_scheduled() {
        let job = Job::new(cleanup(), &EnqueueOptions::default().with_delay(Duration::from_secs(60)));
        assert_eq!(job.status, JobStatus::Delayed);
        assert!(!job.is_ready(Utc::now()));
        assert!(job.is_ready(Utc::now() + chrono::Duration::seconds(61)));
    }

    #[test]
    fn zero_max_attempts_is_clamped_to_one() {
        let job = Job::new(cleanup(), &EnqueueOptions::default().with_max_attempts(0));
        assert_eq!(job.max_attempts, 1);
    }

    #[test]
    fn unset_budget_uses_the_default() {
        let job = Job::new(cleanup(), &EnqueueOptions::default());
        assert_eq!(job.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn released_stalled_job_does_not_count_the_interrupted_attempt() {
        let mut job = Job::new(cleanup(), &EnqueueOptions::default().with_max_attempts(1));
        job.mark_active(Utc::now());
        assert_eq!(job.attempt, 1);

        job.release_stalled();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt, 0);
        assert!(job.started_at.is_none());

        job.mark_active(Utc::now());
        assert_eq!(job.attempt, job.max_attempts);
    }

    #[test]
    fn job_lifecycle() {
        let mut job = Job::new(cleanup(), &EnqueueOptions::default());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt, 0);

        let started = Utc::now();
        job.mark_active(started);
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.attempt, 1);

        job.mark_completed(serde_json::json!({"removed": 4}), started);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.return_value, Some(serde_json::json!({"removed": 4})));
        assert_eq!(job.history.len(), 1);
        assert!(job.history[0].success);
    }

    #[test]
    fn failures_back_off_then_exhaust() {
        let mut job = Job::new(cleanup(), &EnqueueOptions::default().with_max_attempts(2));

        job.mark_active(Utc::now());
        let outcome = job.mark_failed("boom 1".into(), Utc::now(), &fast_backoff());
        assert_eq!(outcome, FailureOutcome::Retrying { delay: Duration::from_millis(100) });
        assert_eq!(job.status, JobStatus::Delayed);
        assert!(job.scheduled_at.is_some());

        job.mark_active(Utc::now());
        let outcome = job.mark_failed("boom 2".into(), Utc::now(), &fast_backoff());
        assert_eq!(outcome, FailureOutcome::Exhausted);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.last_error.as_deref(), Some("boom 2"));
        assert_eq!(job.attempt, 2);
    }

    #[test]
    fn payload_serializes_with_queue_tag() {
        let value = serde_json::to_value(cleanup()).unwrap();
        assert_eq!(value, serde_json::json!({"queue": "cleanup", "data": {"olderThanDays": 30}}));
    }
}
