//! The segment board: client-held state for one composed document.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use talentflow_core::{CandidateProfile, JobContext, RetryPolicy, SegmentId};
use talentflow_observability::SlowOperation;

use crate::error::SegmentError;
use crate::generator::{GenerationRequest, SegmentGenerator};
use crate::html::escape;
use crate::segment::{STATIC_SECTIONS, Segment, SegmentAction, SegmentKind, SegmentStatus};

/// Per-call input to a mutating action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionContext {
    pub instructions: Option<String>,
    /// Overrides the job the board was seeded with.
    pub job: Option<JobContext>,
}

impl ActionContext {
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_job(mut self, job: JobContext) -> Self {
        self.job = Some(job);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateAllReport {
    pub succeeded: Vec<SegmentId>,
    pub failed: Vec<(SegmentId, String)>,
}

impl GenerateAllReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
struct BoardState {
    profile: CandidateProfile,
    job: Option<JobContext>,
    segments: Vec<Segment>,
}

impl BoardState {
    fn segment_mut(&mut self, id: SegmentId) -> Result<&mut Segment, SegmentError> {
        self.segments
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SegmentError::NotFound(id))
    }

    /// Stable sort keeps insertion order among equal `order` values.
    fn ordered(&self) -> Vec<Segment> {
        let mut segments = self.segments.clone();
        segments.sort_by_key(|s| s.order);
        segments
    }
}

/// Ordered, independently regenerable segments seeded from one candidate.
///
/// The board is shared by reference; the lock is never held across a
/// generation call, so actions on different segments run concurrently.
pub struct SegmentBoard {
    state: Mutex<BoardState>,
    generator: Arc<dyn SegmentGenerator>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for SegmentBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentBoard")
            .field("segments", &self.state().segments.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SegmentBoard {
    pub fn new(generator: Arc<dyn SegmentGenerator>) -> Self {
        Self {
            state: Mutex::new(BoardState::default()),
            generator,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the board with the static sections followed by one segment
    /// per experience entry, all idle, ordered from 0.
    pub fn seed(&self, profile: CandidateProfile, job: Option<JobContext>) -> Vec<Segment> {
        let mut segments: Vec<Segment> = STATIC_SECTIONS
            .iter()
            .enumerate()
            .map(|(order, kind)| Segment::for_section(*kind, order as i32))
            .collect();
        let offset = segments.len();
        segments.extend(
            profile
                .experience
                .iter()
                .enumerate()
                .map(|(index, entry)| Segment::for_experience(entry, (offset + index) as i32)),
        );

        info!(
            candidate = %profile.name,
            segments = segments.len(),
            experience = profile.experience.len(),
            "segment board seeded"
        );

        let mut state = self.state();
        *state = BoardState { profile, job, segments };
        state.ordered()
    }

    /// Every segment in render order.
    pub fn segments(&self) -> Vec<Segment> {
        self.state().ordered()
    }

    pub fn visible_segments(&self) -> Vec<Segment> {
        self.segments().into_iter().filter(|s| s.visible).collect()
    }

    pub fn get(&self, id: SegmentId) -> Option<Segment> {
        self.state().segments.iter().find(|s| s.id == id).cloned()
    }

    /// First segment of `kind` in render order.
    pub fn find(&self, kind: SegmentKind) -> Option<Segment> {
        self.segments().into_iter().find(|s| s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.state().segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn regenerate(&self, id: SegmentId, context: &ActionContext) -> Result<Segment, SegmentError> {
        self.apply(id, SegmentAction::Regenerate, context).await
    }

    pub async fn improve(&self, id: SegmentId, context: &ActionContext) -> Result<Segment, SegmentError> {
        self.apply(id, SegmentAction::Improve, context).await
    }

    pub async fn expand(&self, id: SegmentId, context: &ActionContext) -> Result<Segment, SegmentError> {
        self.apply(id, SegmentAction::Expand, context).await
    }

    pub async fn rewrite(&self, id: SegmentId, context: &ActionContext) -> Result<Segment, SegmentError> {
        self.apply(id, SegmentAction::Rewrite, context).await
    }

    /// Move the segment to `loading`, run one retry-wrapped generation and
    /// settle it in `done` (content replaced) or `error` (content kept).
    #[instrument(skip_all, fields(segment_id = %id, action = %action))]
    pub async fn apply(
        &self,
        id: SegmentId,
        action: SegmentAction,
        context: &ActionContext,
    ) -> Result<Segment, SegmentError> {
        let request = {
            let mut state = self.state();
            let profile = state.profile.clone();
            let job = context.job.clone().or_else(|| state.job.clone());
            let segment = state.segment_mut(id)?;
            segment.begin(action)?;
            GenerationRequest {
                action,
                kind: segment.kind,
                title: segment.title.clone(),
                current_content: segment.content.clone(),
                experience: segment.experience_data.clone(),
                profile,
                job,
                instructions: context.instructions.clone(),
            }
        };

        let label = format!("segment.{action}:{}", request.title);
        let outcome = {
            let _timer = SlowOperation::start("segment.generate");
            self.policy
                .retry(&label, || self.generator.generate(&request))
                .await
        };

        let mut state = self.state();
        let Ok(segment) = state.segment_mut(id) else {
            warn!("segment removed while generating, result dropped");
            return Err(SegmentError::NotFound(id));
        };

        match outcome {
            Ok(content) => {
                segment.complete(content);
                debug!(chars = segment.content.len(), "segment generated");
                Ok(segment.clone())
            }
            Err(err) => {
                segment.fail(err.to_string());
                warn!(error = %err, "segment generation failed, previous content kept");
                Err(SegmentError::Generation(err))
            }
        }
    }

    /// First generation of every visible idle segment, all at once.
    pub async fn generate_all(&self, context: &ActionContext) -> GenerateAllReport {
        let pending: Vec<SegmentId> = self
            .segments()
            .into_iter()
            .filter(|s| s.visible && s.status == SegmentStatus::Idle)
            .map(|s| s.id)
            .collect();

        let outcomes = join_all(
            pending
                .iter()
                .map(|id| self.apply(*id, SegmentAction::Regenerate, context)),
        )
        .await;

        let mut report = GenerateAllReport::default();
        for (id, outcome) in pending.into_iter().zip(outcomes) {
            match outcome {
                Ok(_) => report.succeeded.push(id),
                Err(err) => report.failed.push((id, err.to_string())),
            }
        }
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "bulk generation finished"
        );
        report
    }

    /// Manual edit: replaces content and settles the segment in `done`.
    pub fn edit_content(&self, id: SegmentId, content: impl Into<String>) -> Result<Segment, SegmentError> {
        let mut state = self.state();
        let segment = state.segment_mut(id)?;
        segment.edit(content.into())?;
        Ok(segment.clone())
    }

    pub fn set_visible(&self, id: SegmentId, visible: bool) -> Result<Segment, SegmentError> {
        let mut state = self.state();
        let segment = state.segment_mut(id)?;
        segment.visible = visible;
        Ok(segment.clone())
    }

    pub fn set_editable(&self, id: SegmentId, editable: bool) -> Result<Segment, SegmentError> {
        let mut state = self.state();
        let segment = state.segment_mut(id)?;
        segment.editable = editable;
        Ok(segment.clone())
    }

    /// Orders need not be contiguous. Ties render in insertion order.
    pub fn move_to(&self, id: SegmentId, order: i32) -> Result<Segment, SegmentError> {
        let mut state = self.state();
        let segment = state.segment_mut(id)?;
        segment.order = order;
        Ok(segment.clone())
    }

    pub fn remove(&self, id: SegmentId) -> Result<Segment, SegmentError> {
        let mut state = self.state();
        let index = state
            .segments
            .iter()
            .position(|s| s.id == id)
            .ok_or(SegmentError::NotFound(id))?;
        Ok(state.segments.remove(index))
    }

    /// Drop every segment and the seeding context.
    pub fn clear(&self) {
        *self.state() = BoardState::default();
    }

    /// Visible segments with generated content, as one HTML fragment.
    pub fn to_html(&self) -> String {
        self.visible_segments()
            .into_iter()
            .filter_map(|s| {
                let body = s.html_content.as_ref()?;
                Some(format!(
                    "<section data-type=\"{}\"><h2>{}</h2>{body}</section>",
                    s.kind,
                    escape(&s.title)
                ))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
