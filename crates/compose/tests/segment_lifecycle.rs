//! Segment lifecycle against the scripted completion client, with the
//! default retry schedule running on paused time.

use std::sync::Arc;

use talentflow_ai::MockCompletionClient;
use talentflow_compose::{
    ActionContext, CompletionGenerator, STATIC_SECTIONS, SegmentBoard, SegmentError, SegmentKind, SegmentStatus,
};
use talentflow_core::{CandidateProfile, ExperienceEntry, JobContext};

fn profile() -> CandidateProfile {
    CandidateProfile {
        skills: vec!["Rust".into(), "PostgreSQL".into()],
        years_of_experience: 9,
        experience: vec![
            ExperienceEntry::new("Acme", "Lead Engineer", "2019-2024"),
            ExperienceEntry::new("Initech", "Engineer", "2015-2019"),
        ],
        ..CandidateProfile::new("Ada Lovelace", "Lead Engineer")
    }
}

fn board(client: &Arc<MockCompletionClient>) -> SegmentBoard {
    SegmentBoard::new(Arc::new(CompletionGenerator::new(client.clone())))
}

#[tokio::test(start_paused = true)]
async fn failed_regeneration_keeps_previous_summary() {
    let client = Arc::new(MockCompletionClient::new());
    client.set_default("segment.regenerate", "Engineer who ships dependable systems.");
    let board = board(&client);

    let segments = board.seed(profile(), Some(JobContext::new("Staff Engineer", "Globex")));
    assert_eq!(STATIC_SECTIONS.len(), 9);
    assert_eq!(segments.len(), 11);
    assert_eq!(segments.iter().map(|s| s.order).collect::<Vec<_>>(), (0..=10).collect::<Vec<_>>());
    assert!(segments.iter().all(|s| s.status == SegmentStatus::Idle));

    let summary = board.find(SegmentKind::ProfessionalSummary).unwrap();
    let done = board.regenerate(summary.id, &ActionContext::default()).await.unwrap();
    assert_eq!(done.status, SegmentStatus::Done);
    let before = done.content.clone();
    let calls_before = client.call_count("segment.regenerate");

    client.fail_task("segment.regenerate");
    let err = board.regenerate(summary.id, &ActionContext::default()).await.unwrap_err();

    let SegmentError::Generation(retry) = err else {
        panic!("expected a generation failure");
    };
    assert_eq!(retry.attempts, 3);
    assert_eq!(retry.label, "segment.regenerate:PROFESSIONAL SUMMARY");
    assert_eq!(client.call_count("segment.regenerate") - calls_before, 3);

    let after = board.get(summary.id).unwrap();
    assert_eq!(after.status, SegmentStatus::Error);
    assert_eq!(after.content, before);
    assert_eq!(after.html_content, done.html_content);
    assert!(after.last_error.is_some());
    assert_eq!(board.len(), 11);
}

#[tokio::test(start_paused = true)]
async fn failed_first_generation_leaves_segment_empty() {
    let client = Arc::new(MockCompletionClient::new());
    client.fail_task("segment.regenerate");
    let board = board(&client);
    board.seed(profile(), None);

    let summary = board.find(SegmentKind::ProfessionalSummary).unwrap();
    assert!(board.regenerate(summary.id, &ActionContext::default()).await.is_err());

    let after = board.get(summary.id).unwrap();
    assert_eq!(after.status, SegmentStatus::Error);
    assert!(after.content.is_empty());
    assert_eq!(after.html_content, None);
    assert_eq!(client.call_count("segment.regenerate"), 3);
}

#[tokio::test(start_paused = true)]
async fn each_action_replaces_content_on_success() {
    let client = Arc::new(MockCompletionClient::new());
    client.set_default("segment.regenerate", "- Rust\n- PostgreSQL");
    client.set_default("segment.improve", "- Rust (9 years)\n- PostgreSQL tuning");
    client.set_default("segment.expand", "- Rust (9 years), async services\n- PostgreSQL tuning and replication");
    client.set_default("segment.rewrite", "Systems languages and relational data.");
    let board = board(&client);
    board.seed(profile(), None);
    let id = board.find(SegmentKind::TechnicalExpertise).unwrap().id;
    let context = ActionContext::default();

    board.regenerate(id, &context).await.unwrap();
    assert_eq!(
        board.improve(id, &context).await.unwrap().html_content.as_deref(),
        Some("<ul><li>Rust (9 years)</li><li>PostgreSQL tuning</li></ul>")
    );
    assert!(board.expand(id, &context).await.unwrap().content.contains("replication"));
    let rewritten = board.rewrite(id, &context.clone().with_instructions("one sentence")).await.unwrap();
    assert_eq!(rewritten.content, "Systems languages and relational data.");

    let last = client.calls().pop().unwrap();
    assert_eq!(last.task, "segment.rewrite");
    assert!(last.prompt.contains("Current text:\n- Rust (9 years), async services"));
    assert!(last.prompt.contains("Instructions: one sentence"));
}
