use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AiError;

/// One request to the completion service.
///
/// `task` is a stable key for the kind of generation ("summary",
/// "experience", "segment.improve", ...). Clients may use it for routing or
/// metrics; test doubles script responses by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub task: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(task: impl Into<String>, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// The external AI completion service: one call per sub-task.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError>;
}

#[async_trait]
impl<C: CompletionClient + ?Sized> CompletionClient for Arc<C> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
        (**self).complete(request).await
    }
}
