//! Scripted completion client for tests and local development.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::client::{CompletionClient, CompletionRequest};
use crate::error::AiError;

#[derive(Debug, Default)]
struct MockState {
    scripted: HashMap<String, VecDeque<Result<String, AiError>>>,
    defaults: HashMap<String, String>,
    failing: HashSet<String>,
    fallback: Option<String>,
    calls: Vec<CompletionRequest>,
}

/// Completion client whose answers are scripted per `task` key.
///
/// Resolution order for a call: queued responses for the task, then a
/// permanent failure if the task was marked failing, then the task default,
/// then the global fallback. Anything else is a transport error.
#[derive(Debug, Default)]
pub struct MockCompletionClient {
    state: Mutex<MockState>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client answering every enrichment sub-task with well-formed output.
    pub fn for_enrichment() -> Self {
        let client = Self::new();
        client.set_default("job_analysis", r#"{"keySkills":["Rust"],"priorities":["Reliability"],"keywords":["backend"]}"#);
        client.set_default("summary", "Seasoned engineer delivering reliable backend systems.");
        client.set_default(
            "skills",
            r#"{"technical":["Rust","PostgreSQL"],"functional":["Delivery"],"leadership":["Mentoring"]}"#,
        );
        client.set_default(
            "experience",
            r#"{"enhancedDescription":"Led the platform team.","achievements":["Cut latency by 40%"],"technicalEnvironment":["Rust"],"responsibilities":["Owned the roadmap"]}"#,
        );
        client.set_default("areas_of_expertise", r#"["Distributed systems","API design"]"#);
        client.set_default("education", r#"["MSc Computer Science"]"#);
        client.set_default("certifications", r#"["CKA"]"#);
        client.set_default("core_competencies", r#"["System design","Code review"]"#);
        client.set_default("technical_expertise", r#"["Rust","Tokio","PostgreSQL"]"#);
        client.set_default("value_proposition", "Brings calm, measurable delivery to critical systems.");
        client
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer every call for `task` with `response` unless something is queued.
    pub fn set_default(&self, task: impl Into<String>, response: impl Into<String>) {
        self.state().defaults.insert(task.into(), response.into());
    }

    /// Answer every call for any unscripted task with `response`.
    pub fn set_fallback(&self, response: impl Into<String>) {
        self.state().fallback = Some(response.into());
    }

    /// Queue a one-shot outcome for `task`.
    pub fn push(&self, task: impl Into<String>, outcome: Result<String, AiError>) {
        self.state()
            .scripted
            .entry(task.into())
            .or_default()
            .push_back(outcome);
    }

    /// Make every unqueued call for `task` fail.
    pub fn fail_task(&self, task: impl Into<String>) {
        self.state().failing.insert(task.into());
    }

    /// Stop failing `task`.
    pub fn heal_task(&self, task: &str) {
        self.state().failing.remove(task);
    }

    /// All requests seen so far, in call order.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, task: &str) -> usize {
        self.state().calls.iter().filter(|c| c.task == task).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.len()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
        let mut state = self.state();
        state.calls.push(request.clone());

        if let Some(outcome) = state
            .scripted
            .get_mut(&request.task)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }

        if state.failing.contains(&request.task) {
            return Err(AiError::transport(format!(
                "scripted failure for task {}",
                request.task
            )));
        }

        state
            .defaults
            .get(&request.task)
            .or(state.fallback.as_ref())
            .cloned()
            .ok_or_else(|| AiError::transport(format!("no scripted response for task {}", request.task)))
    }
}
