//! The work a queue runs for each claimed job.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::types::Job;

/// A queue's task body. `Ok` carries the job's return value; any error counts
/// as a failed attempt.
#[async_trait]
pub trait TaskBody: Send + Sync {
    async fn run(&self, job: &Job) -> anyhow::Result<serde_json::Value>;
}

struct FnTask<F>(F);

#[async_trait]
impl<F, Fut> TaskBody for FnTask<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
{
    async fn run(&self, job: &Job) -> anyhow::Result<serde_json::Value> {
        (self.0)(job.clone()).await
    }
}

/// Wrap an async closure as a task body.
pub fn task_fn<F, Fut>(f: F) -> Arc<dyn TaskBody>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
{
    Arc::new(FnTask(f))
}
