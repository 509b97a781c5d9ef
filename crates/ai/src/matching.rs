//! Deterministic job/candidate match scoring.
//!
//! Weighted sum, capped at [`MAX_SCORE`]:
//! - skill overlap: up to [`SKILL_WEIGHT`] points, proportional to the share of
//!   required skills the candidate lists (case-insensitive);
//! - minimum experience met: flat [`EXPERIENCE_POINTS`];
//! - exact location match (case-insensitive): flat [`LOCATION_POINTS`].
//!
//! A factor the posting does not specify contributes nothing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use talentflow_core::{CandidateProfile, JobPosting};

pub const SKILL_WEIGHT: u32 = 50;
pub const EXPERIENCE_POINTS: u32 = 25;
pub const LOCATION_POINTS: u32 = 25;
pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: u32,
    pub reasons: Vec<String>,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn score(job: &JobPosting, candidate: &CandidateProfile) -> MatchScore {
    let mut total = 0u32;
    let mut reasons = Vec::new();

    // Required skills, deduplicated, in posting order.
    let mut seen = HashSet::new();
    let required: Vec<&str> = job
        .required_skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen.insert(normalize(s)))
        .collect();

    if !required.is_empty() {
        let held: HashSet<String> = candidate.skills.iter().map(|s| normalize(s)).collect();
        let matched: Vec<&str> = required
            .iter()
            .copied()
            .filter(|skill| held.contains(&normalize(skill)))
            .collect();

        if !matched.is_empty() {
            let points = ((SKILL_WEIGHT as f64) * (matched.len() as f64) / (required.len() as f64))
                .round() as u32;
            total += points;
            reasons.push(format!(
                "Matches {} of {} required skills ({})",
                matched.len(),
                required.len(),
                matched.join(", ")
            ));
        }
    }

    if let Some(min_years) = job.min_years_experience {
        if candidate.years_of_experience >= min_years {
            total += EXPERIENCE_POINTS;
            reasons.push(format!(
                "Meets minimum experience of {min_years} years (has {})",
                candidate.years_of_experience
            ));
        }
    }

    if let (Some(wanted), Some(actual)) = (&job.location, &candidate.location) {
        if !wanted.trim().is_empty() && normalize(wanted) == normalize(actual) {
            total += LOCATION_POINTS;
            reasons.push(format!("Location match: {}", actual.trim()));
        }
    }

    MatchScore {
        score: total.min(MAX_SCORE),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn posting() -> JobPosting {
        JobPosting {
            title: "Backend Engineer".into(),
            required_skills: vec!["Rust".into(), "PostgreSQL".into(), "Kafka".into(), "AWS".into()],
            min_years_experience: Some(5),
            location: Some("Berlin".into()),
            ..Default::default()
        }
    }

    fn candidate(skills: &[&str], years: u32, location: Option<&str>) -> CandidateProfile {
        CandidateProfile {
            name: "Ada".into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            years_of_experience: years,
            location: location.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn perfect_match_scores_100_with_three_reasons() {
        let result = score(
            &posting(),
            &candidate(&["rust", "postgresql", "KAFKA", "aws"], 7, Some(" berlin ")),
        );
        assert_eq!(result.score, 100);
        assert_eq!(result.reasons.len(), 3);
        assert_eq!(result.reasons[2], "Location match: berlin");
    }

    #[test]
    fn partial_skills_are_proportional() {
        let result = score(&posting(), &candidate(&["Rust"], 2, None));
        assert_eq!(result.score, 13); // 50 * 1/4 = 12.5, rounded
        assert_eq!(result.reasons, vec!["Matches 1 of 4 required skills (Rust)"]);
    }

    #[test]
    fn unspecified_factors_contribute_nothing() {
        let job = JobPosting {
            title: "Anything".into(),
            ..Default::default()
        };
        let result = score(&job, &candidate(&["Rust"], 30, Some("Berlin")));
        assert_eq!(result.score, 0);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn duplicate_required_skills_count_once() {
        let job = JobPosting {
            required_skills: vec!["Rust".into(), "rust".into(), " ".into()],
            ..Default::default()
        };
        let result = score(&job, &candidate(&["Rust"], 0, None));
        assert_eq!(result.score, 50);
    }

    proptest! {
        #[test]
        fn score_is_bounded_and_deterministic(
            required in prop::collection::vec("[a-d]{1,2}", 0..6),
            held in prop::collection::vec("[a-d]{1,2}", 0..6),
            min_years in prop::option::of(0u32..20),
            years in 0u32..30,
            job_location in prop::option::of("[xy]"),
            candidate_location in prop::option::of("[xy]"),
        ) {
            let job = JobPosting {
                title: "t".into(),
                required_skills: required,
                min_years_experience: min_years,
                location: job_location,
                ..Default::default()
            };
            let profile = CandidateProfile {
                name: "n".into(),
                skills: held,
                years_of_experience: years,
                location: candidate_location,
                ..Default::default()
            };

            let first = score(&job, &profile);
            let second = score(&job, &profile);
            prop_assert!(first.score <= MAX_SCORE);
            prop_assert_eq!(first, second);
        }
    }
}
