use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, instrument};

use talentflow_ai::{EnrichmentOrchestrator, EnrichmentRequest};

use crate::cache::QueryService;
use crate::jobs::{Job, JobPayload, TaskBody};
use crate::persistence::RecordRepository;

/// Loads the candidate, enriches it, stores the result and drops cached
/// reads of that candidate.
pub struct EnrichmentTask {
    orchestrator: Arc<EnrichmentOrchestrator>,
    records: Arc<dyn RecordRepository>,
    queries: Option<Arc<QueryService>>,
}

impl EnrichmentTask {
    pub fn new(orchestrator: Arc<EnrichmentOrchestrator>, records: Arc<dyn RecordRepository>) -> Self {
        Self {
            orchestrator,
            records,
            queries: None,
        }
    }

    pub fn with_query_service(mut self, queries: Arc<QueryService>) -> Self {
        self.queries = Some(queries);
        self
    }
}

#[async_trait]
impl TaskBody for EnrichmentTask {
    #[instrument(skip_all, fields(job_id = %job.id, attempt = job.attempt))]
    async fn run(&self, job: &Job) -> anyhow::Result<Value> {
        let JobPayload::Enrichment(payload) = &job.payload else {
            bail!("enrichment task received a {} payload", job.payload.queue_name());
        };
        let id = payload.candidate_id;

        let mut record = self
            .records
            .candidate(id)
            .await?
            .ok_or_else(|| anyhow!("candidate {id} not found"))?;

        let mut request = EnrichmentRequest::new(record.profile.clone());
        if let Some(context) = &payload.job {
            request = request.with_job(context.clone());
        }

        let result = self
            .orchestrator
            .enrich(&request)
            .await
            .with_context(|| format!("enriching candidate {id}"))?;
        let entries = result.experience.len();

        record.enrichment = Some(result);
        record.enriched_at = Some(Utc::now());
        self.records.save_candidate(record).await?;

        if let Some(queries) = &self.queries {
            queries.candidate_changed(id).await;
        }

        info!(candidate_id = %id, experience_entries = entries, "candidate enriched");
        Ok(json!({ "candidateId": id, "experienceEntries": entries }))
    }
}
