//! Segment model and its status lifecycle.

use core::fmt;

use serde::{Deserialize, Serialize};

use talentflow_core::{ExperienceEntry, SegmentId};

use crate::error::SegmentError;
use crate::html::render_html;

/// Which generation prompt a segment corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    #[serde(rename = "PROFESSIONAL SUMMARY")]
    ProfessionalSummary,
    #[serde(rename = "CORE COMPETENCIES")]
    CoreCompetencies,
    #[serde(rename = "TECHNICAL EXPERTISE")]
    TechnicalExpertise,
    #[serde(rename = "AREAS OF EXPERTISE")]
    AreasOfExpertise,
    #[serde(rename = "KEY ACHIEVEMENTS")]
    KeyAchievements,
    #[serde(rename = "EDUCATION")]
    Education,
    #[serde(rename = "CERTIFICATIONS")]
    Certifications,
    #[serde(rename = "LANGUAGES")]
    Languages,
    #[serde(rename = "VALUE PROPOSITION")]
    ValueProposition,
    #[serde(rename = "EXPERIENCE")]
    Experience,
}

/// Static sections in render order. Experience segments follow them.
pub const STATIC_SECTIONS: [SegmentKind; 9] = [
    SegmentKind::ProfessionalSummary,
    SegmentKind::CoreCompetencies,
    SegmentKind::TechnicalExpertise,
    SegmentKind::AreasOfExpertise,
    SegmentKind::KeyAchievements,
    SegmentKind::Education,
    SegmentKind::Certifications,
    SegmentKind::Languages,
    SegmentKind::ValueProposition,
];

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::ProfessionalSummary => "PROFESSIONAL SUMMARY",
            SegmentKind::CoreCompetencies => "CORE COMPETENCIES",
            SegmentKind::TechnicalExpertise => "TECHNICAL EXPERTISE",
            SegmentKind::AreasOfExpertise => "AREAS OF EXPERTISE",
            SegmentKind::KeyAchievements => "KEY ACHIEVEMENTS",
            SegmentKind::Education => "EDUCATION",
            SegmentKind::Certifications => "CERTIFICATIONS",
            SegmentKind::Languages => "LANGUAGES",
            SegmentKind::ValueProposition => "VALUE PROPOSITION",
            SegmentKind::Experience => "EXPERIENCE",
        }
    }

    pub fn is_static(&self) -> bool {
        !matches!(self, SegmentKind::Experience)
    }

    /// Whether generated text is expected as a bulleted list.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            SegmentKind::CoreCompetencies
                | SegmentKind::TechnicalExpertise
                | SegmentKind::AreasOfExpertise
                | SegmentKind::KeyAchievements
                | SegmentKind::Education
                | SegmentKind::Certifications
                | SegmentKind::Languages
        )
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    #[default]
    Idle,
    Loading,
    Done,
    Error,
}

impl SegmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Idle => "idle",
            SegmentStatus::Loading => "loading",
            SegmentStatus::Done => "done",
            SegmentStatus::Error => "error",
        }
    }

    /// Settled means no generation call is in flight.
    pub fn is_settled(&self) -> bool {
        !matches!(self, SegmentStatus::Loading)
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutating action. Every action replaces content wholesale on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentAction {
    Regenerate,
    Improve,
    Expand,
    Rewrite,
}

impl SegmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentAction::Regenerate => "regenerate",
            SegmentAction::Improve => "improve",
            SegmentAction::Expand => "expand",
            SegmentAction::Rewrite => "rewrite",
        }
    }

    /// Regenerate doubles as the first generation. The others need content.
    pub fn allowed_from(&self, status: SegmentStatus) -> bool {
        match (self, status) {
            (_, SegmentStatus::Loading) => false,
            (SegmentAction::Regenerate, _) => true,
            (_, SegmentStatus::Idle) => false,
            (_, SegmentStatus::Done | SegmentStatus::Error) => true,
        }
    }
}

impl fmt::Display for SegmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub content: String,
    #[serde(default)]
    pub html_content: Option<String>,
    pub status: SegmentStatus,
    pub order: i32,
    pub visible: bool,
    pub editable: bool,
    #[serde(default)]
    pub experience_data: Option<ExperienceEntry>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl Segment {
    pub fn new(kind: SegmentKind, title: impl Into<String>, order: i32) -> Self {
        Self {
            id: SegmentId::new(),
            title: title.into(),
            kind,
            content: String::new(),
            html_content: None,
            status: SegmentStatus::Idle,
            order,
            visible: true,
            editable: true,
            experience_data: None,
            last_error: None,
        }
    }

    pub fn for_section(kind: SegmentKind, order: i32) -> Self {
        Self::new(kind, kind.as_str(), order)
    }

    /// Titled "{title} at {company}", carrying the entry it was seeded from.
    pub fn for_experience(entry: &ExperienceEntry, order: i32) -> Self {
        let mut segment = Self::new(SegmentKind::Experience, entry.label(), order);
        segment.experience_data = Some(entry.clone());
        segment
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    pub fn ensure_allows(&self, action: SegmentAction) -> Result<(), SegmentError> {
        if action.allowed_from(self.status) {
            Ok(())
        } else {
            Err(SegmentError::InvalidTransition {
                id: self.id,
                action,
                status: self.status,
            })
        }
    }

    pub(crate) fn begin(&mut self, action: SegmentAction) -> Result<(), SegmentError> {
        self.ensure_allows(action)?;
        self.status = SegmentStatus::Loading;
        Ok(())
    }

    pub(crate) fn complete(&mut self, content: String) {
        self.html_content = Some(render_html(&content, self.kind.is_list()));
        self.content = content;
        self.status = SegmentStatus::Done;
        self.last_error = None;
    }

    /// Content and html survive a failed generation.
    pub(crate) fn fail(&mut self, error: impl Into<String>) {
        self.status = SegmentStatus::Error;
        self.last_error = Some(error.into());
    }

    pub(crate) fn edit(&mut self, content: String) -> Result<(), SegmentError> {
        if !self.editable {
            return Err(SegmentError::NotEditable(self.id));
        }
        if self.status == SegmentStatus::Loading {
            return Err(SegmentError::InvalidTransition {
                id: self.id,
                action: SegmentAction::Rewrite,
                status: self.status,
            });
        }
        self.complete(content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use SegmentAction::*;
        use SegmentStatus::*;

        for action in [Regenerate, Improve, Expand, Rewrite] {
            assert!(!action.allowed_from(Loading), "{action} from loading");
            assert!(action.allowed_from(Done), "{action} from done");
            assert!(action.allowed_from(Error), "{action} from error");
        }
        assert!(Regenerate.allowed_from(Idle));
        assert!(!Improve.allowed_from(Idle));
        assert!(!Expand.allowed_from(Idle));
        assert!(!Rewrite.allowed_from(Idle));
    }

    #[test]
    fn failure_keeps_previous_content() {
        let mut segment = Segment::for_section(SegmentKind::ProfessionalSummary, 0);
        segment.begin(SegmentAction::Regenerate).unwrap();
        segment.complete("First draft.".into());

        segment.begin(SegmentAction::Improve).unwrap();
        assert_eq!(segment.status, SegmentStatus::Loading);
        assert!(segment.begin(SegmentAction::Expand).is_err());

        segment.fail("rate limited");
        assert_eq!(segment.status, SegmentStatus::Error);
        assert_eq!(segment.content, "First draft.");
        assert_eq!(segment.html_content.as_deref(), Some("<p>First draft.</p>"));
        assert_eq!(segment.last_error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn experience_segment_is_titled_from_entry() {
        let entry = ExperienceEntry::new("Acme", "Lead Engineer", "2019-2024");
        let segment = Segment::for_experience(&entry, 9);
        assert_eq!(segment.title, "Lead Engineer at Acme");
        assert_eq!(segment.kind, SegmentKind::Experience);
        assert_eq!(segment.experience_data, Some(entry));
    }

    #[test]
    fn serializes_kind_as_type() {
        let segment = Segment::for_section(SegmentKind::CoreCompetencies, 1);
        let value = serde_json::to_value(&segment).unwrap();
        assert_eq!(value["type"], "CORE COMPETENCIES");
        assert_eq!(value["status"], "idle");
        assert_eq!(value["htmlContent"], serde_json::Value::Null);
    }
}
