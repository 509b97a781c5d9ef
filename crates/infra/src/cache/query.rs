//! Cached read side: search, pipeline and profile queries.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use talentflow_core::{CandidateId, CandidateProfile, JobPostingId};
use talentflow_observability::SlowOperation;

use super::cached::{CacheStats, CacheStatsSnapshot, Cached};
use super::store::CacheStore;
use super::ttl::CacheTtl;
use crate::persistence::{ApplicationStage, CandidateRecord, RepositoryError};

/// Structured search filters. Skills are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub min_years: Option<u32>,
}

impl SearchFilters {
    /// Equivalent filters normalize to equal values.
    pub fn normalized(&self) -> Self {
        let mut skills: Vec<String> = self
            .skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        skills.sort();
        skills.dedup();

        Self {
            skills,
            location: self
                .location
                .as_deref()
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty()),
            min_years: self.min_years,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub id: CandidateId,
    pub name: String,
    pub title: String,
    pub location: Option<String>,
    pub years_of_experience: u32,
    pub skills: Vec<String>,
}

impl From<&CandidateRecord> for CandidateSummary {
    fn from(record: &CandidateRecord) -> Self {
        Self {
            id: record.id,
            name: record.profile.name.clone(),
            title: record.profile.title.clone(),
            location: record.profile.location.clone(),
            years_of_experience: record.profile.years_of_experience,
            skills: record.profile.skills.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEntry {
    pub candidate_id: CandidateId,
    pub name: String,
    pub stage: ApplicationStage,
    pub score: Option<u32>,
}

/// Uncached read model the query service sits in front of.
#[async_trait]
pub trait SearchRepository: Send + Sync {
    async fn search_candidates(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<CandidateSummary>, RepositoryError>;

    async fn pipeline(&self, posting: JobPostingId) -> Result<Vec<PipelineEntry>, RepositoryError>;

    async fn candidate_profile(&self, id: CandidateId) -> Result<Option<CandidateProfile>, RepositoryError>;
}

pub const CANDIDATES_TAG: &str = "candidates";

pub fn candidate_tag(id: CandidateId) -> String {
    format!("candidate:{id}")
}

pub fn pipeline_tag(posting: JobPostingId) -> String {
    format!("pipeline:{posting}")
}

/// Read-through cache over a [`SearchRepository`], with tag-based
/// invalidation for the write side.
pub struct QueryService {
    store: Arc<CacheStore>,
    repository: Arc<dyn SearchRepository>,
    stats: Arc<CacheStats>,
    search: Cached<Vec<CandidateSummary>>,
    pipeline: Cached<Vec<PipelineEntry>>,
    profile: Cached<Option<CandidateProfile>>,
}

impl QueryService {
    pub fn new(store: Arc<CacheStore>, repository: Arc<dyn SearchRepository>) -> Self {
        let stats = Arc::new(CacheStats::default());
        Self {
            search: Cached::new(Arc::clone(&store), "search.candidates", CacheTtl::Search).with_stats(Arc::clone(&stats)),
            pipeline: Cached::new(Arc::clone(&store), "pipeline.view", CacheTtl::Pipeline).with_stats(Arc::clone(&stats)),
            profile: Cached::new(Arc::clone(&store), "candidate.profile", CacheTtl::Profile)
                .with_stats(Arc::clone(&stats)),
            store,
            repository,
            stats,
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn search_candidates(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<CandidateSummary>, RepositoryError> {
        let _timer = SlowOperation::start("query.search_candidates");
        let query = query.trim().to_lowercase();
        let filters = filters.normalized();
        let params = json!({ "query": query, "filters": filters });

        self.search
            .get_or_compute(&params, &[CANDIDATES_TAG.to_string()], || {
                self.repository.search_candidates(&query, &filters)
            })
            .await
    }

    /// Tagged with the posting and every listed candidate, since entries
    /// carry candidate names.
    pub async fn pipeline_view(&self, posting: JobPostingId) -> Result<Vec<PipelineEntry>, RepositoryError> {
        let _timer = SlowOperation::start("query.pipeline_view");
        let tags = |entries: &Vec<PipelineEntry>| {
            std::iter::once(pipeline_tag(posting))
                .chain(entries.iter().map(|e| candidate_tag(e.candidate_id)))
                .collect::<Vec<String>>()
        };
        self.pipeline
            .get_or_compute_tagged(&json!({ "jobId": posting }), tags, || self.repository.pipeline(posting))
            .await
    }

    pub async fn candidate_profile(&self, id: CandidateId) -> Result<Option<CandidateProfile>, RepositoryError> {
        let _timer = SlowOperation::start("query.candidate_profile");
        self.profile
            .get_or_compute(&json!({ "candidateId": id }), &[candidate_tag(id)], || {
                self.repository.candidate_profile(id)
            })
            .await
    }

    /// A candidate changed: drop its profile, every search listing and the
    /// pipeline views that list it.
    pub async fn candidate_changed(&self, id: CandidateId) -> usize {
        self.invalidate(&[candidate_tag(id), CANDIDATES_TAG.to_string()]).await
    }

    /// Applications for a posting changed: drop its pipeline view.
    pub async fn pipeline_changed(&self, posting: JobPostingId) -> usize {
        self.invalidate(&[pipeline_tag(posting)]).await
    }

    async fn invalidate(&self, tags: &[String]) -> usize {
        match self.store.invalidate_by_tags(tags).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(?tags, error = %e, "cache invalidation failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::InMemoryBackend;
    use crate::persistence::{ApplicationRecord, InMemoryRecordRepository, RecordRepository};
    use talentflow_ai::MatchScore;

    async fn service() -> (Arc<InMemoryRecordRepository>, QueryService, CandidateId) {
        let repo = Arc::new(InMemoryRecordRepository::new());
        let id = CandidateId::new();
        let profile = CandidateProfile {
            skills: vec!["Rust".into(), "Kafka".into()],
            location: Some("Berlin".into()),
            years_of_experience: 7,
            ..CandidateProfile::new("Ada Lovelace", "Backend Engineer")
        };
        repo.save_candidate(CandidateRecord::new(id, profile)).await.unwrap();

        let store = Arc::new(CacheStore::new(Arc::new(InMemoryBackend::new()), "tf:"));
        let service = QueryService::new(store, repo.clone());
        (repo, service, id)
    }

    #[tokio::test]
    async fn equivalent_searches_share_one_entry() {
        let (repo, service, _) = service().await;
        let filters = SearchFilters { skills: vec!["Rust".into(), "kafka".into()], ..Default::default() };
        let reordered = SearchFilters { skills: vec![" KAFKA".into(), "rust".into()], ..Default::default() };

        let first = service.search_candidates("Engineer", &filters).await.unwrap();
        let second = service.search_candidates("  engineer ", &reordered).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(repo.query_count(), 1);
        assert_eq!(service.stats().hits, 1);
    }

    #[tokio::test]
    async fn candidate_change_invalidates_profile_and_searches() {
        let (repo, service, id) = service().await;

        service.candidate_profile(id).await.unwrap();
        service.search_candidates("", &SearchFilters::default()).await.unwrap();
        service.candidate_profile(id).await.unwrap();
        assert_eq!(repo.query_count(), 2);

        let mut record = repo.candidate(id).await.unwrap().unwrap();
        record.profile.title = "Staff Engineer".into();
        repo.save_candidate(record).await.unwrap();
        assert_eq!(service.candidate_changed(id).await, 2);

        let profile = service.candidate_profile(id).await.unwrap().unwrap();
        assert_eq!(profile.title, "Staff Engineer");
        let hits = service.search_candidates("", &SearchFilters::default()).await.unwrap();
        assert_eq!(hits[0].title, "Staff Engineer");
        assert_eq!(repo.query_count(), 4);
    }

    #[tokio::test]
    async fn pipeline_view_is_cached_per_posting() {
        let (repo, service, id) = service().await;
        let posting = JobPostingId::new();

        assert!(service.pipeline_view(posting).await.unwrap().is_empty());

        let mut application = ApplicationRecord::new(posting, id);
        application.match_score = Some(MatchScore { score: 75, reasons: vec![] });
        repo.save_application(application).await.unwrap();

        // Stale until the write side says otherwise.
        assert!(service.pipeline_view(posting).await.unwrap().is_empty());
        service.pipeline_changed(posting).await;

        let view = service.pipeline_view(posting).await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].score, Some(75));
        assert_eq!(repo.query_count(), 2);
    }

    #[tokio::test]
    async fn renamed_candidate_refreshes_pipeline_views_listing_it() {
        let (repo, service, id) = service().await;
        let (listed, unrelated) = (JobPostingId::new(), JobPostingId::new());
        repo.save_application(ApplicationRecord::new(listed, id)).await.unwrap();

        assert_eq!(service.pipeline_view(listed).await.unwrap()[0].name, "Ada Lovelace");
        assert!(service.pipeline_view(unrelated).await.unwrap().is_empty());

        let mut record = repo.candidate(id).await.unwrap().unwrap();
        record.profile.name = "Ada King".into();
        repo.save_candidate(record).await.unwrap();
        service.candidate_changed(id).await;

        assert_eq!(service.pipeline_view(listed).await.unwrap()[0].name, "Ada King");
        assert!(service.pipeline_view(unrelated).await.unwrap().is_empty());
        // Only the view listing the candidate was recomputed.
        assert_eq!(repo.query_count(), 3);
    }

    #[tokio::test]
    async fn unknown_candidate_is_cached_as_absent() {
        let (repo, service, _) = service().await;
        let missing = CandidateId::new();

        assert_eq!(service.candidate_profile(missing).await.unwrap(), None);
        assert_eq!(service.candidate_profile(missing).await.unwrap(), None);
        assert_eq!(repo.query_count(), 1);
    }
}
