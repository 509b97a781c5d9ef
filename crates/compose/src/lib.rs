//! `talentflow-compose`
//!
//! **Responsibility:** the segment state machine behind document composition.
//!
//! - A [`SegmentBoard`] is seeded from a candidate profile: a fixed list of
//!   static sections followed by one segment per experience entry.
//! - Each segment moves `idle -> loading -> done | error` independently.
//!   Regenerate, improve, expand and rewrite each issue one retry-wrapped
//!   generation call and replace content only on success.
//! - Visibility and order are presentation state and never gated by status.

pub mod board;
pub mod error;
pub mod generator;
pub mod html;
pub mod segment;

pub use board::{ActionContext, GenerateAllReport, SegmentBoard};
pub use error::SegmentError;
pub use generator::{CompletionGenerator, GenerationRequest, SegmentGenerator};
pub use html::render_html;
pub use segment::{STATIC_SECTIONS, Segment, SegmentAction, SegmentKind, SegmentStatus};
