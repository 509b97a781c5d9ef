//! Generation of one segment's text through the completion service.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use talentflow_ai::enrichment::parse;
use talentflow_ai::{AiError, CompletionClient, CompletionRequest};
use talentflow_core::{CandidateProfile, ExperienceEntry, JobContext};

use crate::segment::{SegmentAction, SegmentKind};

/// Everything a generator sees for one call. Built from a snapshot taken
/// when the segment entered `loading`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub action: SegmentAction,
    pub kind: SegmentKind,
    pub title: String,
    pub current_content: String,
    pub experience: Option<ExperienceEntry>,
    pub profile: CandidateProfile,
    pub job: Option<JobContext>,
    pub instructions: Option<String>,
}

/// Produces the full replacement text for a segment. Called once per
/// attempt; the board owns retries.
#[async_trait]
pub trait SegmentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError>;
}

#[async_trait]
impl<G: SegmentGenerator + ?Sized> SegmentGenerator for Arc<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        (**self).generate(request).await
    }
}

const SYSTEM_PROMPT: &str = "You write concise, factual CV sections. Respond with the section text only.";

/// [`SegmentGenerator`] over a [`CompletionClient`]. Requests are keyed
/// `segment.{action}`.
pub struct CompletionGenerator {
    client: Arc<dyn CompletionClient>,
    max_tokens: Option<u32>,
}

impl CompletionGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn build(&self, request: &GenerationRequest) -> CompletionRequest {
        let mut prompt = String::new();
        let section = &request.title;

        match request.action {
            SegmentAction::Regenerate => {
                let _ = writeln!(prompt, "Write the \"{section}\" section of this candidate's CV.");
            }
            SegmentAction::Improve => {
                let _ = writeln!(prompt, "Improve the wording of the \"{section}\" section. Keep every fact.");
            }
            SegmentAction::Expand => {
                let _ = writeln!(prompt, "Expand the \"{section}\" section with more concrete detail.");
            }
            SegmentAction::Rewrite => {
                let _ = writeln!(prompt, "Rewrite the \"{section}\" section from scratch in a different style.");
            }
        }
        if request.kind.is_list() {
            prompt.push_str("Answer with one item per line.\n");
        }

        let profile = &request.profile;
        let _ = writeln!(
            prompt,
            "Candidate: {}, {} ({} years)",
            profile.name, profile.title, profile.years_of_experience
        );
        push_list(&mut prompt, "Skills", &profile.skills);
        match request.kind {
            SegmentKind::Education => push_list(&mut prompt, "Education", &profile.education),
            SegmentKind::Certifications => push_list(&mut prompt, "Certifications", &profile.certifications),
            SegmentKind::Languages => push_list(&mut prompt, "Languages", &profile.languages),
            _ => {}
        }

        if let Some(entry) = &request.experience {
            let _ = writeln!(prompt, "Entry: {} ({})", entry.label(), entry.period);
            for line in &entry.responsibilities {
                let _ = writeln!(prompt, "- {line}");
            }
        }

        if let Some(job) = &request.job {
            let _ = writeln!(prompt, "Target role: {} at {}", job.title, job.company);
            push_list(&mut prompt, "Required skills", &job.required_skills);
        }

        if request.action != SegmentAction::Regenerate && !request.current_content.is_empty() {
            let _ = writeln!(prompt, "Current text:\n{}", request.current_content);
        }

        if let Some(instructions) = request.instructions.as_deref().filter(|i| !i.trim().is_empty()) {
            let _ = writeln!(prompt, "Instructions: {}", instructions.trim());
        }

        let completion = CompletionRequest::new(format!("segment.{}", request.action), SYSTEM_PROMPT, prompt);
        match self.max_tokens {
            Some(max_tokens) => completion.with_max_tokens(max_tokens),
            None => completion,
        }
    }
}

fn push_list(prompt: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        let _ = writeln!(prompt, "{label}: {}", items.join(", "));
    }
}

#[async_trait]
impl SegmentGenerator for CompletionGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let raw = self.client.complete(&self.build(request)).await?;
        parse::text(&raw)
    }
}
