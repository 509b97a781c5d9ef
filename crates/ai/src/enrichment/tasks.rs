//! The independent sub-tasks an enrichment run fans out into.

use std::fmt::Write as _;

use crate::client::CompletionRequest;

use super::model::{EnrichmentRequest, JobAnalysis};

const SYSTEM: &str = "You are an expert recruiter and CV writer. Answer with the requested \
format only, without commentary.";

/// One unit of enrichment work; each is retried independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubTask {
    JobAnalysis,
    Summary,
    Skills,
    /// Enrichment of the experience entry at this index.
    Experience(usize),
    AreasOfExpertise,
    Education,
    Certifications,
    CoreCompetencies,
    TechnicalExpertise,
    ValueProposition,
}

impl SubTask {
    /// Stable task key sent with the completion request.
    pub fn key(&self) -> &'static str {
        match self {
            SubTask::JobAnalysis => "job_analysis",
            SubTask::Summary => "summary",
            SubTask::Skills => "skills",
            SubTask::Experience(_) => "experience",
            SubTask::AreasOfExpertise => "areas_of_expertise",
            SubTask::Education => "education",
            SubTask::Certifications => "certifications",
            SubTask::CoreCompetencies => "core_competencies",
            SubTask::TechnicalExpertise => "technical_expertise",
            SubTask::ValueProposition => "value_proposition",
        }
    }

    /// Diagnostic label used by the retry engine.
    pub fn label(&self) -> String {
        match self {
            SubTask::Experience(index) => format!("enrich.experience[{index}]"),
            other => format!("enrich.{}", other.key()),
        }
    }

    pub fn build(&self, request: &EnrichmentRequest, analysis: Option<&JobAnalysis>) -> CompletionRequest {
        let profile = &request.profile;
        let mut prompt = String::new();

        match self {
            SubTask::JobAnalysis => {
                prompt.push_str(
                    "Analyse this job. Return JSON {\"keySkills\":[],\"priorities\":[],\"keywords\":[]}.\n",
                );
            }
            SubTask::Summary => {
                prompt.push_str("Write a three to four sentence professional summary for this candidate.\n");
            }
            SubTask::Skills => {
                prompt.push_str(
                    "Categorise the candidate's skills. Return JSON \
                     {\"technical\":[],\"functional\":[],\"leadership\":[]}.\n",
                );
            }
            SubTask::Experience(index) => {
                prompt.push_str(
                    "Enrich this experience entry. Return JSON {\"enhancedDescription\":\"\",\
                     \"achievements\":[],\"technicalEnvironment\":[],\"responsibilities\":[]}.\n",
                );
                if let Some(entry) = profile.experience.get(*index) {
                    let _ = writeln!(prompt, "Entry: {} ({})", entry.label(), entry.period);
                    for line in &entry.responsibilities {
                        let _ = writeln!(prompt, "- {line}");
                    }
                }
            }
            SubTask::AreasOfExpertise => {
                prompt.push_str("List 4-6 areas of expertise as a JSON array of strings.\n");
            }
            SubTask::Education => {
                prompt.push_str("Rewrite the education entries concisely as a JSON array of strings.\n");
                push_list(&mut prompt, "Education", &profile.education);
            }
            SubTask::Certifications => {
                prompt.push_str("Rewrite the certifications concisely as a JSON array of strings.\n");
                push_list(&mut prompt, "Certifications", &profile.certifications);
            }
            SubTask::CoreCompetencies => {
                prompt.push_str("List 6-8 core competencies as a JSON array of strings.\n");
            }
            SubTask::TechnicalExpertise => {
                prompt.push_str("List the technical expertise as a JSON array of strings.\n");
            }
            SubTask::ValueProposition => {
                prompt.push_str("Write a two sentence value proposition for this candidate.\n");
            }
        }

        if !matches!(self, SubTask::JobAnalysis) {
            let _ = writeln!(
                prompt,
                "Candidate: {}, {} ({} years)",
                profile.name, profile.title, profile.years_of_experience
            );
            push_list(&mut prompt, "Skills", &profile.skills);
            if !profile.summary.is_empty() {
                let _ = writeln!(prompt, "Current summary: {}", profile.summary);
            }
        }

        if let Some(job) = &request.job {
            let _ = writeln!(prompt, "Target role: {} at {}", job.title, job.company);
            if matches!(self, SubTask::JobAnalysis) {
                push_list(&mut prompt, "Requirements", &job.requirements);
                push_list(&mut prompt, "Required skills", &job.required_skills);
                push_list(&mut prompt, "Responsibilities", &job.responsibilities);
            }
        }

        if let (Some(analysis), SubTask::Skills | SubTask::Experience(_)) = (analysis, self) {
            push_list(&mut prompt, "Emphasise skills", &analysis.key_skills);
            push_list(&mut prompt, "Role priorities", &analysis.priorities);
            push_list(&mut prompt, "Keywords", &analysis.keywords);
        }

        CompletionRequest::new(self.key(), SYSTEM, prompt)
    }
}

fn push_list(prompt: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(prompt, "{heading}: {}", items.join(", "));
}
