//! Candidate and job data consumed by enrichment, scoring and composition.
//!
//! These are plain, serialisable snapshots. Persistence owns the records;
//! everything downstream works on immutable copies.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::id::{CandidateId, JobPostingId};

/// One entry of a candidate's work history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub company: String,
    pub title: String,
    pub period: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

impl ExperienceEntry {
    pub fn new(
        company: impl Into<String>,
        title: impl Into<String>,
        period: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            title: title.into(),
            period: period.into(),
            responsibilities: Vec::new(),
        }
    }

    pub fn with_responsibilities<I, S>(mut self, responsibilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.responsibilities = responsibilities.into_iter().map(Into::into).collect();
        self
    }

    /// "Title at Company", used as a display label.
    pub fn label(&self) -> String {
        format!("{} at {}", self.title, self.company)
    }
}

/// Raw candidate data as entered or parsed from a CV.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    #[serde(default)]
    pub id: Option<CandidateId>,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub years_of_experience: u32,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
}

impl CandidateProfile {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Reject profiles nothing sensible can be generated from.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("candidate name must not be empty"));
        }
        for (index, entry) in self.experience.iter().enumerate() {
            if entry.company.trim().is_empty() && entry.title.trim().is_empty() {
                return Err(CoreError::validation(format!(
                    "experience entry {index} has neither company nor title"
                )));
            }
        }
        Ok(())
    }
}

/// The role a document is being tailored for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

impl JobContext {
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            ..Default::default()
        }
    }
}

/// A posting as seen by match scoring.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    #[serde(default)]
    pub id: Option<JobPostingId>,
    pub title: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub min_years_experience: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
}
