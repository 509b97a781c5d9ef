//! Explicit owner of every queue in the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use super::observer::{QueueObserver, TracingObserver};
use super::queue::{JobQueue, JobQueueError, QueueConfig, QueueWorkerHandle};
use super::store::JobStore;
use super::task::TaskBody;
use super::types::{EnqueueOptions, Job, JobId, JobPayload, QueueName, QueueSnapshot};

/// Builder for [`QueueRegistry`]. Every queue shares the store and observer.
pub struct QueueRegistryBuilder {
    store: Arc<dyn JobStore>,
    observer: Arc<dyn QueueObserver>,
    queues: HashMap<QueueName, Arc<JobQueue>>,
}

impl QueueRegistryBuilder {
    pub fn with_observer(mut self, observer: Arc<dyn QueueObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Register `body` for `queue` with the queue's default configuration.
    pub fn register(self, queue: QueueName, body: Arc<dyn TaskBody>) -> Self {
        self.register_with(queue, QueueConfig::for_queue(queue), body)
    }

    pub fn register_with(mut self, queue: QueueName, config: QueueConfig, body: Arc<dyn TaskBody>) -> Self {
        let job_queue = JobQueue::new(queue, config, Arc::clone(&self.store), body)
            .with_observer(Arc::clone(&self.observer));
        self.queues.insert(queue, Arc::new(job_queue));
        self
    }

    pub fn build(self) -> QueueRegistry {
        QueueRegistry {
            queues: self.queues,
            handles: Mutex::new(Vec::new()),
        }
    }
}

/// Every queue with its task body, passed by reference to whoever enqueues.
pub struct QueueRegistry {
    queues: HashMap<QueueName, Arc<JobQueue>>,
    handles: Mutex<Vec<QueueWorkerHandle>>,
}

impl QueueRegistry {
    pub fn builder(store: Arc<dyn JobStore>) -> QueueRegistryBuilder {
        QueueRegistryBuilder {
            store,
            observer: Arc::new(TracingObserver),
            queues: HashMap::new(),
        }
    }

    pub fn queue(&self, name: QueueName) -> Result<&Arc<JobQueue>, JobQueueError> {
        self.queues.get(&name).ok_or(JobQueueError::UnknownQueue(name))
    }

    pub fn queue_names(&self) -> Vec<QueueName> {
        let mut names: Vec<_> = self.queues.keys().copied().collect();
        names.sort();
        names
    }

    pub async fn enqueue(
        &self,
        queue: QueueName,
        payload: JobPayload,
        options: EnqueueOptions,
    ) -> Result<Job, JobQueueError> {
        self.queue(queue)?.enqueue(payload, options).await
    }

    pub async fn get_status(&self, queue: QueueName) -> Result<QueueSnapshot, JobQueueError> {
        self.queue(queue)?.get_status().await
    }

    pub async fn get_job(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobQueueError> {
        self.queue(queue)?.get_job(id).await
    }

    pub async fn remove(&self, queue: QueueName, id: &JobId) -> Result<Job, JobQueueError> {
        self.queue(queue)?.remove(id).await
    }

    pub async fn retry_failed(&self, queue: QueueName, id: &JobId) -> Result<Job, JobQueueError> {
        self.queue(queue)?.retry_failed(id).await
    }

    /// Snapshot of every registered queue.
    pub async fn status_all(&self) -> Result<BTreeMap<QueueName, QueueSnapshot>, JobQueueError> {
        let mut all = BTreeMap::new();
        for (name, queue) in &self.queues {
            all.insert(*name, queue.get_status().await?);
        }
        Ok(all)
    }

    /// Start a worker for every queue not already running.
    pub fn start_all(&self) -> usize {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let mut started = 0;
        for queue in self.queues.values() {
            if let Ok(handle) = queue.start() {
                handles.push(handle);
                started += 1;
            }
        }
        info!(queues = started, "queue workers started");
        started
    }

    /// Stop every worker, waiting for in-flight task bodies.
    pub async fn shutdown_all(&self) {
        let handles: Vec<_> = {
            let mut guard = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            guard.drain(..).collect()
        };
        futures::future::join_all(handles.into_iter().map(QueueWorkerHandle::shutdown)).await;
        info!("queue workers stopped");
    }
}
