//! Persistence ports: key-based reads and whole-record updates for
//! candidates, postings and applications.
//!
//! The schema lives elsewhere; an in-memory implementation backs tests and
//! local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use talentflow_ai::{EnrichmentResult, MatchScore};
use talentflow_core::{CandidateId, CandidateProfile, JobPosting, JobPostingId};

use crate::cache::query::{CandidateSummary, PipelineEntry, SearchFilters, SearchRepository};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub profile: CandidateProfile,
    #[serde(default)]
    pub enrichment: Option<EnrichmentResult>,
    #[serde(default)]
    pub enriched_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRecord {
    pub fn new(id: CandidateId, mut profile: CandidateProfile) -> Self {
        profile.id = Some(id);
        Self {
            id,
            profile,
            enrichment: None,
            enriched_at: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStage {
    #[default]
    Applied,
    Screening,
    Interview,
    Offer,
    Hired,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub posting_id: JobPostingId,
    pub candidate_id: CandidateId,
    pub stage: ApplicationStage,
    #[serde(default)]
    pub match_score: Option<MatchScore>,
    #[serde(default)]
    pub scored_at: Option<DateTime<Utc>>,
}

impl ApplicationRecord {
    pub fn new(posting_id: JobPostingId, candidate_id: CandidateId) -> Self {
        Self {
            posting_id,
            candidate_id,
            stage: ApplicationStage::default(),
            match_score: None,
            scored_at: None,
        }
    }
}

#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn candidate(&self, id: CandidateId) -> Result<Option<CandidateRecord>, RepositoryError>;

    async fn save_candidate(&self, record: CandidateRecord) -> Result<(), RepositoryError>;

    async fn posting(&self, id: JobPostingId) -> Result<Option<JobPosting>, RepositoryError>;

    async fn save_posting(&self, id: JobPostingId, posting: JobPosting) -> Result<(), RepositoryError>;

    async fn application(
        &self,
        posting: JobPostingId,
        candidate: CandidateId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;

    async fn save_application(&self, record: ApplicationRecord) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRecordRepository {
    candidates: RwLock<HashMap<CandidateId, CandidateRecord>>,
    postings: RwLock<HashMap<JobPostingId, JobPosting>>,
    applications: RwLock<HashMap<(JobPostingId, CandidateId), ApplicationRecord>>,
    searches: AtomicUsize,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Searches and listings served so far. Lets tests tell cache hits apart.
    pub fn query_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    fn count_query(&self) {
        self.searches.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn candidate(&self, id: CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        Ok(self.candidates.read().await.get(&id).cloned())
    }

    async fn save_candidate(&self, mut record: CandidateRecord) -> Result<(), RepositoryError> {
        record.updated_at = Utc::now();
        self.candidates.write().await.insert(record.id, record);
        Ok(())
    }

    async fn posting(&self, id: JobPostingId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self.postings.read().await.get(&id).cloned())
    }

    async fn save_posting(&self, id: JobPostingId, mut posting: JobPosting) -> Result<(), RepositoryError> {
        posting.id = Some(id);
        self.postings.write().await.insert(id, posting);
        Ok(())
    }

    async fn application(
        &self,
        posting: JobPostingId,
        candidate: CandidateId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self.applications.read().await.get(&(posting, candidate)).cloned())
    }

    async fn save_application(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        self.applications
            .write()
            .await
            .insert((record.posting_id, record.candidate_id), record);
        Ok(())
    }
}

fn matches_filters(profile: &CandidateProfile, query: &str, filters: &SearchFilters) -> bool {
    let text_match = query.is_empty()
        || profile.name.to_lowercase().contains(query)
        || profile.title.to_lowercase().contains(query)
        || profile.summary.to_lowercase().contains(query)
        || profile.skills.iter().any(|s| s.to_lowercase().contains(query));

    let skills_match = filters
        .skills
        .iter()
        .all(|wanted| profile.skills.iter().any(|s| s.trim().eq_ignore_ascii_case(wanted)));

    let location_match = filters.location.as_deref().is_none_or(|wanted| {
        profile
            .location
            .as_deref()
            .is_some_and(|l| l.trim().eq_ignore_ascii_case(wanted))
    });

    let years_match = filters.min_years.is_none_or(|min| profile.years_of_experience >= min);

    text_match && skills_match && location_match && years_match
}

#[async_trait]
impl SearchRepository for InMemoryRecordRepository {
    async fn search_candidates(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<CandidateSummary>, RepositoryError> {
        self.count_query();
        let query = query.trim().to_lowercase();
        let candidates = self.candidates.read().await;
        let mut hits: Vec<CandidateSummary> = candidates
            .values()
            .filter(|r| matches_filters(&r.profile, &query, filters))
            .map(CandidateSummary::from)
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(hits)
    }

    async fn pipeline(&self, posting: JobPostingId) -> Result<Vec<PipelineEntry>, RepositoryError> {
        self.count_query();
        let applications = self.applications.read().await;
        let candidates = self.candidates.read().await;

        let mut entries: Vec<PipelineEntry> = applications
            .values()
            .filter(|a| a.posting_id == posting)
            .map(|a| PipelineEntry {
                candidate_id: a.candidate_id,
                name: candidates
                    .get(&a.candidate_id)
                    .map(|c| c.profile.name.clone())
                    .unwrap_or_default(),
                stage: a.stage,
                score: a.match_score.as_ref().map(|m| m.score),
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.candidate_id.cmp(&b.candidate_id)));
        Ok(entries)
    }

    async fn candidate_profile(&self, id: CandidateId) -> Result<Option<CandidateProfile>, RepositoryError> {
        self.count_query();
        Ok(self.candidates.read().await.get(&id).map(|r| r.profile.clone()))
    }
}
