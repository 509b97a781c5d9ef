//! Task bodies bound to queues.

pub mod enrichment;
pub mod matching;

pub use enrichment::EnrichmentTask;
pub use matching::MatchingTask;
