use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use talentflow_ai::score;

use crate::cache::QueryService;
use crate::jobs::{Job, JobPayload, TaskBody};
use crate::persistence::{ApplicationRecord, RecordRepository};

/// Scores candidates against a posting and stores the score on each
/// application.
pub struct MatchingTask {
    records: Arc<dyn RecordRepository>,
    queries: Option<Arc<QueryService>>,
}

impl MatchingTask {
    pub fn new(records: Arc<dyn RecordRepository>) -> Self {
        Self { records, queries: None }
    }

    pub fn with_query_service(mut self, queries: Arc<QueryService>) -> Self {
        self.queries = Some(queries);
        self
    }
}

#[async_trait]
impl TaskBody for MatchingTask {
    #[instrument(skip_all, fields(job_id = %job.id))]
    async fn run(&self, job: &Job) -> anyhow::Result<Value> {
        let JobPayload::Matching(payload) = &job.payload else {
            bail!("matching task received a {} payload", job.payload.queue_name());
        };
        let posting_id = payload.posting_id;
        let posting = self
            .records
            .posting(posting_id)
            .await?
            .ok_or_else(|| anyhow!("job posting {posting_id} not found"))?;

        let mut scored = Vec::with_capacity(payload.candidate_ids.len());
        let mut skipped = Vec::new();
        for &candidate_id in &payload.candidate_ids {
            let Some(candidate) = self.records.candidate(candidate_id).await? else {
                warn!(candidate_id = %candidate_id, "candidate missing, skipping");
                skipped.push(candidate_id);
                continue;
            };

            let result = score(&posting, &candidate.profile);
            let mut application = self
                .records
                .application(posting_id, candidate_id)
                .await?
                .unwrap_or_else(|| ApplicationRecord::new(posting_id, candidate_id));
            application.match_score = Some(result.clone());
            application.scored_at = Some(Utc::now());
            self.records.save_application(application).await?;

            scored.push(json!({ "candidateId": candidate_id, "score": result.score }));
        }

        if let Some(queries) = &self.queries {
            queries.pipeline_changed(posting_id).await;
        }

        Ok(json!({ "postingId": posting_id, "scored": scored, "skipped": skipped }))
    }
}
