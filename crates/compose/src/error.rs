use thiserror::Error;

use talentflow_ai::AiError;
use talentflow_core::{RetryError, SegmentId};

use crate::segment::{SegmentAction, SegmentStatus};

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("segment not found: {0}")]
    NotFound(SegmentId),

    #[error("cannot {action} segment {id} while it is {status}")]
    InvalidTransition {
        id: SegmentId,
        action: SegmentAction,
        status: SegmentStatus,
    },

    #[error("segment {0} is not editable")]
    NotEditable(SegmentId),

    /// Generation exhausted its retries; the segment kept its prior content.
    #[error(transparent)]
    Generation(#[from] RetryError<AiError>),
}

impl SegmentError {
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, SegmentError::Generation(_))
    }
}
