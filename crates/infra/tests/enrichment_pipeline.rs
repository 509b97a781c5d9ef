//! Enrichment and matching driven through real queue workers, with the
//! cached read side observing the writes.

use std::sync::Arc;
use std::time::Duration;

use talentflow_ai::{EnrichmentOrchestrator, MockCompletionClient};
use talentflow_core::{CandidateId, CandidateProfile, ExperienceEntry, JobPosting, JobPostingId, RetryPolicy};
use talentflow_infra::cache::{CacheStore, InMemoryBackend, QueryService};
use talentflow_infra::jobs::{
    EnqueueOptions, EnrichmentPayload, InMemoryJobStore, JobId, JobPayload, JobStatus, MatchingPayload, QueueConfig,
    QueueEvent, QueueName, QueueRegistry, RecordingObserver,
};
use talentflow_infra::persistence::{CandidateRecord, InMemoryRecordRepository, RecordRepository};
use talentflow_infra::tasks::{EnrichmentTask, MatchingTask};

struct Harness {
    client: Arc<MockCompletionClient>,
    records: Arc<InMemoryRecordRepository>,
    queries: Arc<QueryService>,
    observer: Arc<RecordingObserver>,
    registry: QueueRegistry,
}

fn fast(queue: QueueName) -> QueueConfig {
    QueueConfig::for_queue(queue)
        .with_poll_interval(Duration::from_millis(10))
        .with_backoff(RetryPolicy::fixed(3, Duration::from_millis(5)))
}

fn harness() -> Harness {
    let client = Arc::new(MockCompletionClient::for_enrichment());
    let records = Arc::new(InMemoryRecordRepository::new());
    let store = Arc::new(CacheStore::new(Arc::new(InMemoryBackend::new()), "test:"));
    let queries = Arc::new(QueryService::new(store, records.clone()));
    let observer = Arc::new(RecordingObserver::new());

    let orchestrator = Arc::new(
        EnrichmentOrchestrator::new(client.clone()).with_retry_policy(RetryPolicy::fixed(2, Duration::from_millis(1))),
    );

    let registry = QueueRegistry::builder(InMemoryJobStore::arc())
        .with_observer(observer.clone())
        .register_with(
            QueueName::Enrichment,
            fast(QueueName::Enrichment),
            Arc::new(EnrichmentTask::new(orchestrator, records.clone()).with_query_service(queries.clone())),
        )
        .register_with(
            QueueName::Matching,
            fast(QueueName::Matching),
            Arc::new(MatchingTask::new(records.clone()).with_query_service(queries.clone())),
        )
        .build();

    Harness { client, records, queries, observer, registry }
}

async fn seed_candidate(records: &InMemoryRecordRepository) -> CandidateId {
    let id = CandidateId::new();
    let profile = CandidateProfile {
        skills: vec!["Rust".into(), "PostgreSQL".into()],
        years_of_experience: 8,
        location: Some("Lisbon".into()),
        experience: vec![ExperienceEntry::new("Acme", "Lead Engineer", "2018-2024")],
        ..CandidateProfile::new("Ada Lovelace", "Lead Engineer")
    };
    records.save_candidate(CandidateRecord::new(id, profile)).await.unwrap();
    id
}

async fn wait_for_terminal(registry: &QueueRegistry, queue: QueueName, id: &JobId) -> JobStatus {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(job) = registry.get_job(queue, id).await.unwrap() {
                if job.status.is_terminal() {
                    return job.status;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not finish in time")
}

#[tokio::test]
async fn enrichment_job_updates_record_and_invalidates_profile() {
    let h = harness();
    let id = seed_candidate(&h.records).await;

    // Warm the cache, then let the worker change the record underneath it.
    let before = h.queries.candidate_profile(id).await.unwrap().unwrap();
    assert_eq!(before.title, "Lead Engineer");

    h.registry.start_all();
    let job = h
        .registry
        .enqueue(
            QueueName::Enrichment,
            JobPayload::Enrichment(EnrichmentPayload { candidate_id: id, job: None }),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(wait_for_terminal(&h.registry, QueueName::Enrichment, &job.id).await, JobStatus::Completed);
    h.registry.shutdown_all().await;

    let record = h.records.candidate(id).await.unwrap().unwrap();
    assert!(record.enrichment.is_some());

    let stored = h.registry.get_job(QueueName::Enrichment, &job.id).await.unwrap().unwrap();
    assert_eq!(stored.return_value, Some(serde_json::json!({ "candidateId": id, "experienceEntries": 1 })));

    // The profile entry was dropped, so this read goes back to the repository.
    let reads_before = h.records.query_count();
    h.queries.candidate_profile(id).await.unwrap();
    assert_eq!(h.records.query_count(), reads_before + 1);
}

#[tokio::test]
async fn failing_sub_task_retries_the_job_then_fails_it() {
    let h = harness();
    let id = seed_candidate(&h.records).await;
    h.client.fail_task("certifications");

    h.registry.start_all();
    let job = h
        .registry
        .enqueue(
            QueueName::Enrichment,
            JobPayload::Enrichment(EnrichmentPayload { candidate_id: id, job: None }),
            EnqueueOptions::default().with_max_attempts(2),
        )
        .await
        .unwrap();

    assert_eq!(wait_for_terminal(&h.registry, QueueName::Enrichment, &job.id).await, JobStatus::Failed);
    h.registry.shutdown_all().await;

    let failed = h.registry.get_job(QueueName::Enrichment, &job.id).await.unwrap().unwrap();
    assert_eq!(failed.attempt, 2);
    assert!(failed.last_error.as_deref().unwrap().contains("enrich.certifications"));
    // Two job attempts, each running the sub-task under a two-attempt policy.
    assert_eq!(h.client.call_count("certifications"), 4);
    assert!(h.records.candidate(id).await.unwrap().unwrap().enrichment.is_none());

    let exhausted: Vec<bool> = h
        .observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            QueueEvent::Failed { exhausted, .. } => Some(exhausted),
            _ => None,
        })
        .collect();
    assert_eq!(exhausted, vec![false, true]);
}

#[tokio::test]
async fn matching_job_refreshes_the_pipeline_view() {
    let h = harness();
    let candidate = seed_candidate(&h.records).await;
    let posting = JobPostingId::new();
    h.records
        .save_posting(
            posting,
            JobPosting {
                title: "Platform Engineer".into(),
                required_skills: vec!["Rust".into(), "Kubernetes".into()],
                min_years_experience: Some(5),
                location: Some("Lisbon".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(h.queries.pipeline_view(posting).await.unwrap().is_empty());

    h.registry.start_all();
    let job = h
        .registry
        .enqueue(
            QueueName::Matching,
            JobPayload::Matching(MatchingPayload { posting_id: posting, candidate_ids: vec![candidate] }),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(wait_for_terminal(&h.registry, QueueName::Matching, &job.id).await, JobStatus::Completed);
    h.registry.shutdown_all().await;

    let view = h.queries.pipeline_view(posting).await.unwrap();
    assert_eq!(view.len(), 1);
    // Half the skills (25) plus experience (25) plus location (25).
    assert_eq!(view[0].score, Some(75));
}
