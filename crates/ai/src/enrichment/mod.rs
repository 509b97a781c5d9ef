//! Enrichment orchestrator.
//!
//! One run executes the optional job analysis first (its
//! output feeds the skill and experience prompts), then launches every other
//! sub-task concurrently. Each sub-task goes through the retry engine under
//! its own label. The first exhausted sub-task fails the whole run: there is
//! no partial `EnrichmentResult`.

mod model;
pub mod parse;
mod tasks;

use std::sync::Arc;

use futures::future::try_join_all;
use thiserror::Error;
use tracing::{info, instrument, warn};

use talentflow_core::{CoreError, RetryError, RetryPolicy};
use talentflow_observability::SlowOperation;

use crate::client::CompletionClient;
use crate::error::AiError;

pub use model::{
    CategorizedSkills, EnrichedExperience, EnrichmentRequest, EnrichmentResult, JobAnalysis,
};
pub use tasks::SubTask;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("invalid enrichment request: {0}")]
    InvalidRequest(#[from] CoreError),

    #[error(transparent)]
    SubTaskFailed(#[from] RetryError<AiError>),
}

impl EnrichmentError {
    /// Label of the sub-task that exhausted its retries, if that is the cause.
    pub fn failed_label(&self) -> Option<&str> {
        match self {
            EnrichmentError::SubTaskFailed(err) => Some(&err.label),
            EnrichmentError::InvalidRequest(_) => None,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExperienceOutput {
    enhanced_description: String,
    #[serde(default)]
    achievements: Vec<String>,
    #[serde(default)]
    technical_environment: Vec<String>,
    #[serde(default)]
    responsibilities: Vec<String>,
}

pub struct EnrichmentOrchestrator {
    client: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
}

impl EnrichmentOrchestrator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[instrument(
        skip(self, request),
        fields(
            candidate = %request.profile.name,
            experience_entries = request.profile.experience.len(),
            has_job = request.job.is_some()
        ),
        err
    )]
    pub async fn enrich(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult, EnrichmentError> {
        request.profile.validate()?;
        let _timer = SlowOperation::start("enrichment.enrich");

        let analysis = match &request.job {
            Some(_) => Some(
                self.run(SubTask::JobAnalysis, request, None, parse::json::<JobAnalysis>)
                    .await?,
            ),
            None => None,
        };
        let analysis = analysis.as_ref();

        let experience = try_join_all(
            (0..request.profile.experience.len()).map(|index| self.experience(request, index, analysis)),
        );

        let result = tokio::try_join!(
            self.run(SubTask::Summary, request, analysis, parse::text),
            self.run(SubTask::Skills, request, analysis, parse::json::<CategorizedSkills>),
            experience,
            self.run(SubTask::AreasOfExpertise, request, analysis, parse::list),
            self.run(SubTask::Education, request, analysis, parse::list),
            self.run(SubTask::Certifications, request, analysis, parse::list),
            self.run(SubTask::CoreCompetencies, request, analysis, parse::list),
            self.run(SubTask::TechnicalExpertise, request, analysis, parse::list),
            self.run(SubTask::ValueProposition, request, analysis, parse::text),
        );

        let (
            enhanced_summary,
            skills,
            experience,
            areas_of_expertise,
            education,
            certifications,
            core_competencies,
            technical_expertise,
            value_proposition,
        ) = match result {
            Ok(parts) => parts,
            Err(err) => {
                warn!(failed = ?err.failed_label(), "enrichment aborted, no result produced");
                return Err(err);
            }
        };

        info!("enrichment completed");
        Ok(EnrichmentResult {
            enhanced_summary,
            skills,
            experience,
            areas_of_expertise,
            value_proposition,
            education,
            certifications,
            core_competencies,
            technical_expertise,
        })
    }

    async fn experience(
        &self,
        request: &EnrichmentRequest,
        index: usize,
        analysis: Option<&JobAnalysis>,
    ) -> Result<EnrichedExperience, EnrichmentError> {
        let output = self
            .run(SubTask::Experience(index), request, analysis, parse::json::<ExperienceOutput>)
            .await?;
        let entry = &request.profile.experience[index];
        Ok(EnrichedExperience {
            company: entry.company.clone(),
            title: entry.title.clone(),
            period: entry.period.clone(),
            enhanced_description: output.enhanced_description,
            achievements: output.achievements,
            technical_environment: output.technical_environment,
            responsibilities: output.responsibilities,
        })
    }

    async fn run<T>(
        &self,
        task: SubTask,
        request: &EnrichmentRequest,
        analysis: Option<&JobAnalysis>,
        parse: fn(&str) -> Result<T, AiError>,
    ) -> Result<T, EnrichmentError> {
        let completion = task.build(request, analysis);
        let completion = &completion;
        let client = &self.client;

        let value = self
            .policy
            .retry(&task.label(), || async move {
                let raw = client.complete(completion).await?;
                parse(&raw)
            })
            .await?;
        Ok(value)
    }
}
