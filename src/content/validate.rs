//! Content validation
//!
//! Integrity rules are fatal: a lesson breaking one can never be played.
//! Authoring rules are collected into a report for the catalog tooling.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use super::catalog::Catalog;
use super::types::{GradeLevel, Item, Lesson, LessonVariant, UnlockRequirement};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentIntegrityError {
    #[error("lesson {lesson_id} has no items")]
    EmptyLesson { lesson_id: String },
    #[error("challenge set {set_id} in lesson {lesson_id} has no items")]
    EmptyChallengeSet { lesson_id: String, set_id: String },
    #[error("item {item_id} in lesson {lesson_id} has {count} choices, at least 2 are required")]
    TooFewChoices {
        lesson_id: String,
        item_id: String,
        count: usize,
    },
    #[error("item {item_id} in lesson {lesson_id}: correct choice {index} is out of range for {count} choices")]
    CorrectIndexOutOfRange {
        lesson_id: String,
        item_id: String,
        index: usize,
        count: usize,
    },
    #[error("item {item_id} step {step} in lesson {lesson_id} has {count} choices, at least 2 are required")]
    StepTooFewChoices {
        lesson_id: String,
        item_id: String,
        step: usize,
        count: usize,
    },
    #[error("item {item_id} step {step} in lesson {lesson_id}: correct choice {index} is out of range for {count} choices")]
    StepCorrectIndexOutOfRange {
        lesson_id: String,
        item_id: String,
        step: usize,
        index: usize,
        count: usize,
    },
    #[error("lesson {lesson_id}: mastery threshold {threshold} is outside [0, 1]")]
    ThresholdOutOfRange { lesson_id: String, threshold: f64 },
}

/// Every integrity violation in `lesson`, in authored order.
pub fn lesson_integrity_errors(lesson: &Lesson) -> Vec<ContentIntegrityError> {
    let mut errors = Vec::new();

    if lesson.items.is_empty() {
        errors.push(ContentIntegrityError::EmptyLesson {
            lesson_id: lesson.id.clone(),
        });
    }

    for item in &lesson.items {
        check_item(&lesson.id, item, &mut errors);
    }

    for set in &lesson.challenge_sets {
        if set.items.is_empty() {
            errors.push(ContentIntegrityError::EmptyChallengeSet {
                lesson_id: lesson.id.clone(),
                set_id: set.id.clone(),
            });
        }
        for item in &set.items {
            check_item(&lesson.id, item, &mut errors);
        }
    }

    if let Some(assessment) = &lesson.assessment {
        let threshold = assessment.mastery_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            errors.push(ContentIntegrityError::ThresholdOutOfRange {
                lesson_id: lesson.id.clone(),
                threshold,
            });
        }
    }

    errors
}

/// Rejects a lesson that cannot be played.
pub fn validate_lesson(lesson: &Lesson) -> Result<(), ContentIntegrityError> {
    match lesson_integrity_errors(lesson).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check_item(lesson_id: &str, item: &Item, errors: &mut Vec<ContentIntegrityError>) {
    let count = item.choices.len();
    if count < 2 {
        errors.push(ContentIntegrityError::TooFewChoices {
            lesson_id: lesson_id.to_string(),
            item_id: item.id.clone(),
            count,
        });
    }
    if item.correct_index >= count {
        errors.push(ContentIntegrityError::CorrectIndexOutOfRange {
            lesson_id: lesson_id.to_string(),
            item_id: item.id.clone(),
            index: item.correct_index,
            count,
        });
    }

    for (step_index, step) in item.steps.iter().enumerate() {
        let count = step.choices.len();
        if count < 2 {
            errors.push(ContentIntegrityError::StepTooFewChoices {
                lesson_id: lesson_id.to_string(),
                item_id: item.id.clone(),
                step: step_index,
                count,
            });
        }
        if step.correct_index >= count {
            errors.push(ContentIntegrityError::StepCorrectIndexOutOfRange {
                lesson_id: lesson_id.to_string(),
                item_id: item.id.clone(),
                step: step_index,
                index: step.correct_index,
                count,
            });
        }
    }
}

// ==================== Catalog report ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn error(lesson_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            lesson_id: lesson_id.map(str::to_string),
            message: message.into(),
        }
    }

    fn warning(lesson_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            lesson_id: lesson_id.map(str::to_string),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.lesson_id {
            Some(id) => write!(f, "[{level}] {id}: {}", self.message),
            None => write!(f, "[{level}] {}", self.message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub lesson_count: usize,
    pub grades: Vec<GradeLevel>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }
}

/// Checks every lesson and playlist and reports all problems at once.
pub fn validate_catalog(catalog: &Catalog) -> ValidationReport {
    let mut issues = Vec::new();
    let known_ids: HashSet<&str> = catalog.lessons.iter().map(|l| l.id.as_str()).collect();
    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut variants_by_strand: BTreeMap<(GradeLevel, String), BTreeSet<LessonVariant>> =
        BTreeMap::new();

    for lesson in &catalog.lessons {
        let lid = Some(lesson.id.as_str());

        if !seen_ids.insert(lesson.id.as_str()) {
            issues.push(ValidationIssue::error(lid, "duplicate lesson id"));
        }

        for err in lesson_integrity_errors(lesson) {
            issues.push(ValidationIssue::error(lid, err.to_string()));
        }

        if lesson.objectives.is_empty() {
            issues.push(ValidationIssue::error(lid, "objectives must not be empty"));
        }
        match lesson.variant {
            Some(variant) => {
                let strand = lesson.strand_id.clone().unwrap_or_default();
                variants_by_strand
                    .entry((lesson.grade, strand))
                    .or_default()
                    .insert(variant);
            }
            None => issues.push(ValidationIssue::error(lid, "variant is missing")),
        }
        if lesson.difficulty.is_none() {
            issues.push(ValidationIssue::error(lid, "difficulty is missing"));
        }

        for (index, item) in lesson.items.iter().enumerate() {
            if item.hint_ladder(0).is_empty() {
                issues.push(ValidationIssue::error(
                    lid,
                    format!("item {} must include at least one hint", index + 1),
                ));
            }
        }

        for link in &lesson.remediation_links {
            if !known_ids.contains(link.prerequisite_lesson_id.as_str()) {
                issues.push(ValidationIssue::warning(
                    lid,
                    format!(
                        "remediation link points at unknown lesson '{}'",
                        link.prerequisite_lesson_id
                    ),
                ));
            }
        }

        if let UnlockRequirement::UnitCompleted { lesson_id } = &lesson.unlock {
            match lesson_id.as_deref().map(str::trim) {
                Some(target) if known_ids.contains(target) => {}
                Some(target) if !target.is_empty() => issues.push(ValidationIssue::warning(
                    lid,
                    format!("unlock requirement references unknown lesson '{target}'"),
                )),
                _ => issues.push(ValidationIssue::warning(
                    lid,
                    "unlock requirement has no lesson id and will always be open",
                )),
            }
        }
    }

    for ((grade, strand), variants) in &variants_by_strand {
        let missing: Vec<&str> = LessonVariant::ALL
            .iter()
            .filter(|variant| !variants.contains(variant))
            .map(|variant| variant.as_str())
            .collect();
        if !missing.is_empty() {
            issues.push(ValidationIssue::error(
                None,
                format!("{grade}/{strand} missing lesson variants: {}", missing.join(", ")),
            ));
        }
    }

    check_playlist_positions(catalog, &mut issues);

    ValidationReport {
        lesson_count: catalog.lessons.len(),
        grades: catalog.grades().into_iter().collect(),
        issues,
    }
}

fn check_playlist_positions(catalog: &Catalog, issues: &mut Vec<ValidationIssue>) {
    let mut positions: HashMap<(&str, u32), &str> = HashMap::new();
    for lesson in &catalog.lessons {
        let (Some(playlist), Some(position)) =
            (lesson.playlist_id.as_deref(), lesson.playlist_position)
        else {
            continue;
        };
        if let Some(first) = positions.insert((playlist, position), lesson.id.as_str()) {
            issues.push(ValidationIssue::error(
                Some(lesson.id.as_str()),
                format!("playlist {playlist} position {position} is already used by {first}"),
            ));
        }
    }

    for playlist in &catalog.playlists {
        for lesson_id in &playlist.lesson_ids {
            if catalog.lesson(lesson_id).is_none() {
                issues.push(ValidationIssue::warning(
                    None,
                    format!("playlist {} lists unknown lesson '{lesson_id}'", playlist.id),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::types::{
        Assessment, AssessmentKind, ChallengeSet, Difficulty, InteractionKind, Step,
    };

    fn item(id: &str, correct: usize) -> Item {
        Item {
            id: id.to_string(),
            prompt: format!("prompt {id}"),
            choices: vec!["a".into(), "b".into(), "c".into()],
            correct_index: correct,
            steps: Vec::new(),
            hints: vec!["look again".into()],
            voice_prompt: None,
            tactile_guidance: None,
            kind: InteractionKind::MultipleChoice,
        }
    }

    fn lesson(id: &str, variant: LessonVariant) -> Lesson {
        Lesson {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            grade: GradeLevel::Kindergarten,
            topic: "counting".into(),
            items: vec![item("q1", 0)],
            challenge_sets: Vec::new(),
            remediation_links: Vec::new(),
            unlock: UnlockRequirement::Always,
            assessment: None,
            badge: None,
            playlist_id: None,
            playlist_position: None,
            strand_id: Some("counting".into()),
            variant: Some(variant),
            difficulty: Some(Difficulty::Emerging),
            objectives: vec!["count to 10".into()],
        }
    }

    #[test]
    fn empty_lesson_is_rejected() {
        let mut l = lesson("k-1", LessonVariant::Practice);
        l.items.clear();
        assert_eq!(
            validate_lesson(&l),
            Err(ContentIntegrityError::EmptyLesson {
                lesson_id: "k-1".into()
            })
        );
    }

    #[test]
    fn out_of_range_indices_are_reported() {
        let mut l = lesson("k-1", LessonVariant::Practice);
        l.items[0].correct_index = 3;
        let mut stepped = item("q2", 1);
        stepped.steps.push(Step {
            prompt: "first".into(),
            choices: vec!["x".into()],
            correct_index: 4,
            hint: None,
        });
        l.items.push(stepped);
        l.challenge_sets.push(ChallengeSet {
            id: "cs".into(),
            title: "Bonus".into(),
            items: Vec::new(),
            threshold: 1,
        });
        l.assessment = Some(Assessment {
            kind: AssessmentKind::QuickCheck,
            mastery_threshold: 1.5,
            minimum_items: 0,
        });

        let errors = lesson_integrity_errors(&l);
        assert_eq!(errors.len(), 5);
        assert!(matches!(
            errors[0],
            ContentIntegrityError::CorrectIndexOutOfRange { index: 3, count: 3, .. }
        ));
        assert!(matches!(errors[1], ContentIntegrityError::StepTooFewChoices { step: 0, .. }));
        assert!(matches!(
            errors[2],
            ContentIntegrityError::StepCorrectIndexOutOfRange { index: 4, .. }
        ));
        assert!(matches!(errors[3], ContentIntegrityError::EmptyChallengeSet { .. }));
        assert!(matches!(errors[4], ContentIntegrityError::ThresholdOutOfRange { .. }));
    }

    #[test]
    fn complete_strand_passes() {
        let catalog = Catalog {
            version: None,
            lessons: vec![
                lesson("k-p", LessonVariant::Practice),
                lesson("k-c", LessonVariant::Challenge),
                lesson("k-r", LessonVariant::Remediation),
            ],
            playlists: Vec::new(),
        };
        let report = validate_catalog(&catalog);
        assert!(report.is_ok(), "{:?}", report.issues);
        assert_eq!(report.lesson_count, 3);
        assert_eq!(report.grades, vec![GradeLevel::Kindergarten]);
    }

    #[test]
    fn authoring_problems_are_all_collected() {
        let mut practice = lesson("k-p", LessonVariant::Practice);
        practice.objectives.clear();
        practice.items[0].hints.clear();
        practice.playlist_id = Some("pl".into());
        practice.playlist_position = Some(1);
        practice.unlock = UnlockRequirement::unit_completed("nowhere");

        let mut duplicate = lesson("k-p2", LessonVariant::Practice);
        duplicate.playlist_id = Some("pl".into());
        duplicate.playlist_position = Some(1);

        let catalog = Catalog {
            version: None,
            lessons: vec![practice, duplicate],
            playlists: Vec::new(),
        };
        let report = validate_catalog(&catalog);

        assert!(!report.is_ok());
        let messages: Vec<String> = report.issues.iter().map(|i| i.message.clone()).collect();
        assert!(messages.iter().any(|m| m == "objectives must not be empty"));
        assert!(messages.iter().any(|m| m == "item 1 must include at least one hint"));
        assert!(messages
            .iter()
            .any(|m| m == "kindergarten/counting missing lesson variants: challenge, remediation"));
        assert!(messages.iter().any(|m| m.contains("position 1 is already used by k-p")));
        assert_eq!(report.warnings().count(), 1);
    }
}
