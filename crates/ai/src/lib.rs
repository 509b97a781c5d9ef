//! `talentflow-ai`
//!
//! **Responsibility:** the AI boundary.
//!
//! - `CompletionClient` is the single request/response seam to the external
//!   completion service. Every call through it is wrapped by the retry engine.
//! - The enrichment orchestrator fans a profile out into independent
//!   sub-tasks and merges them into one `EnrichmentResult`, all or nothing.
//! - Match scoring is deterministic and does not call the model at all.

pub mod client;
pub mod enrichment;
pub mod error;
pub mod matching;
pub mod mock;

#[cfg(feature = "http")]
pub mod http;

pub use client::{CompletionClient, CompletionRequest};
pub use enrichment::{
    CategorizedSkills, EnrichedExperience, EnrichmentError, EnrichmentOrchestrator,
    EnrichmentRequest, EnrichmentResult, JobAnalysis, SubTask,
};
pub use error::AiError;
pub use matching::{MatchScore, score};
pub use mock::MockCompletionClient;
