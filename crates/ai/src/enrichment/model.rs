use serde::{Deserialize, Serialize};

use talentflow_core::{CandidateProfile, JobContext};

/// Input bundle for one enrichment run. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRequest {
    pub profile: CandidateProfile,
    #[serde(default)]
    pub job: Option<JobContext>,
}

impl EnrichmentRequest {
    pub fn new(profile: CandidateProfile) -> Self {
        Self { profile, job: None }
    }

    pub fn with_job(mut self, job: JobContext) -> Self {
        self.job = Some(job);
        self
    }
}

/// Preliminary reading of a job's requirements, fed to the skill and
/// experience sub-tasks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAnalysis {
    #[serde(default)]
    pub key_skills: Vec<String>,
    #[serde(default)]
    pub priorities: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedSkills {
    #[serde(default)]
    pub technical: Vec<String>,
    #[serde(default)]
    pub functional: Vec<String>,
    #[serde(default)]
    pub leadership: Vec<String>,
}

/// Enrichment of one experience entry; 1:1 with the input entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedExperience {
    pub company: String,
    pub title: String,
    pub period: String,
    pub enhanced_description: String,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub technical_environment: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

/// Atomic merge of every sub-task output. Never partially materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub enhanced_summary: String,
    pub skills: CategorizedSkills,
    pub experience: Vec<EnrichedExperience>,
    pub areas_of_expertise: Vec<String>,
    pub value_proposition: String,
    pub education: Vec<String>,
    pub certifications: Vec<String>,
    pub core_competencies: Vec<String>,
    pub technical_expertise: Vec<String>,
}
