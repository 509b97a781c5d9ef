//! `talentflow-core`: shared building blocks.
//!
//! Identifiers, the candidate/job data model consumed by enrichment and
//! composition, the core error model, and the retry engine that every call
//! into an unreliable collaborator goes through.

pub mod error;
pub mod id;
pub mod profile;
pub mod retry;

pub use error::{CoreError, CoreResult};
pub use id::{CandidateId, JobPostingId, SegmentId};
pub use profile::{CandidateProfile, ExperienceEntry, JobContext, JobPosting};
pub use retry::{BackoffStrategy, RetryError, RetryPolicy, Retryable, run_with_retry};
