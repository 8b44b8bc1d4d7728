//! Unit gating
//!
//! Decides which lessons are navigable from persisted completion flags.
//! Unknown or malformed references open rather than lock content.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::content::{ContentProvider, GradeLevel, Lesson, LessonSummary, UnlockRequirement};
use crate::progress::ProgressStore;

/// Evaluates `requirement` against externally read flags.
///
/// `completion` returns `None` for a lesson id the catalog does not know.
pub fn is_unlocked<F>(
    requirement: &UnlockRequirement,
    grade_mastered: bool,
    diagnostic_passed: bool,
    completion: F,
) -> bool
where
    F: Fn(&str) -> Option<bool>,
{
    match requirement {
        UnlockRequirement::Always => true,
        UnlockRequirement::GradeMastery => grade_mastered || diagnostic_passed,
        UnlockRequirement::Diagnostic => diagnostic_passed,
        UnlockRequirement::UnitCompleted { lesson_id } => {
            let Some(lesson_id) = lesson_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
            else {
                warn!("unit requirement without a lesson id, leaving unit open");
                return true;
            };
            match completion(lesson_id) {
                Some(completed) => completed,
                None => {
                    warn!(
                        lesson_id = %lesson_id,
                        "unit requirement references unknown lesson, leaving unit open"
                    );
                    true
                }
            }
        }
    }
}

/// Human-readable unlock condition for the unit map.
pub fn unlock_status_description(requirement: &UnlockRequirement) -> String {
    match requirement {
        UnlockRequirement::Always => "Available".to_string(),
        UnlockRequirement::GradeMastery => {
            "Finish every lesson in the previous grade or pass the placement check".to_string()
        }
        UnlockRequirement::Diagnostic => "Pass the placement check to unlock".to_string(),
        UnlockRequirement::UnitCompleted {
            lesson_id: Some(lesson_id),
        } if !lesson_id.trim().is_empty() => format!("Complete {} to unlock", lesson_id.trim()),
        UnlockRequirement::UnitCompleted { .. } => "Available".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStatus {
    pub lesson: LessonSummary,
    pub unlocked: bool,
    pub completed: bool,
    pub status: String,
}

/// Gating decisions backed by a content provider and a progress store.
pub struct GatingEvaluator<'a, C: ?Sized, P: ?Sized> {
    content: &'a C,
    progress: &'a P,
}

impl<'a, C, P> GatingEvaluator<'a, C, P>
where
    C: ContentProvider + ?Sized,
    P: ProgressStore + ?Sized,
{
    pub fn new(content: &'a C, progress: &'a P) -> Self {
        Self { content, progress }
    }

    /// Whether every lesson of `grade` has its completion flag set.
    pub fn grade_completed(&self, grade: GradeLevel) -> bool {
        self.content
            .lessons_for_grade(grade)
            .iter()
            .all(|lesson| self.progress.completion_flag(grade, &lesson.id))
    }

    /// Mastery of the grade preceding `grade`; a grade with no
    /// predecessor counts as mastered.
    pub fn prior_grade_mastered(&self, grade: GradeLevel) -> bool {
        match grade.prerequisite() {
            Some(prior) => self.grade_completed(prior),
            None => true,
        }
    }

    pub fn is_lesson_unlocked(&self, lesson: &Lesson) -> bool {
        is_unlocked(
            &lesson.unlock,
            self.prior_grade_mastered(lesson.grade),
            self.progress.diagnostic_passed(lesson.grade),
            |lesson_id| {
                self.content
                    .lesson(lesson_id)
                    .map(|target| self.progress.completion_flag(target.grade, lesson_id))
            },
        )
    }

    pub fn unit_map(&self, grade: GradeLevel) -> Vec<UnitStatus> {
        let grade_mastered = self.prior_grade_mastered(grade);
        let diagnostic_passed = self.progress.diagnostic_passed(grade);

        self.content
            .lessons_for_grade(grade)
            .iter()
            .map(|lesson| {
                let unlocked = is_unlocked(
                    &lesson.unlock,
                    grade_mastered,
                    diagnostic_passed,
                    |lesson_id| {
                        self.content
                            .lesson(lesson_id)
                            .map(|target| self.progress.completion_flag(target.grade, lesson_id))
                    },
                );
                UnitStatus {
                    lesson: lesson.summary(),
                    unlocked,
                    completed: self.progress.completion_flag(grade, &lesson.id),
                    status: unlock_status_description(&lesson.unlock),
                }
            })
            .collect()
    }

    /// Ids of every unlocked lesson across all grades.
    pub fn unlocked_lesson_ids(&self) -> BTreeSet<String> {
        GradeLevel::ALL
            .into_iter()
            .flat_map(|grade| self.unit_map(grade))
            .filter(|unit| unit.unlocked)
            .map(|unit| unit.lesson.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &str) -> Option<bool> {
        Some(false)
    }

    #[test]
    fn diagnostic_overrides_grade_mastery() {
        assert!(is_unlocked(&UnlockRequirement::GradeMastery, false, true, never));
        assert!(is_unlocked(&UnlockRequirement::GradeMastery, true, false, never));
        assert!(!is_unlocked(&UnlockRequirement::GradeMastery, false, false, never));
    }

    #[test]
    fn diagnostic_requirement_ignores_mastery() {
        assert!(!is_unlocked(&UnlockRequirement::Diagnostic, true, false, never));
        assert!(is_unlocked(&UnlockRequirement::Diagnostic, false, true, never));
    }

    #[test]
    fn unit_completed_fails_open() {
        let unknown = |_: &str| None;
        assert!(is_unlocked(
            &UnlockRequirement::unit_completed("missing_id"),
            false,
            false,
            unknown
        ));
        assert!(is_unlocked(
            &UnlockRequirement::UnitCompleted { lesson_id: None },
            false,
            false,
            never
        ));
        assert!(is_unlocked(
            &UnlockRequirement::unit_completed("  "),
            false,
            false,
            never
        ));
        assert!(!is_unlocked(
            &UnlockRequirement::unit_completed("k-1"),
            true,
            true,
            never
        ));
        assert!(is_unlocked(
            &UnlockRequirement::unit_completed("k-1"),
            false,
            false,
            |id| Some(id == "k-1")
        ));
    }

    #[test]
    fn every_requirement_has_a_description() {
        let requirements = [
            UnlockRequirement::Always,
            UnlockRequirement::GradeMastery,
            UnlockRequirement::Diagnostic,
            UnlockRequirement::unit_completed("k-1"),
            UnlockRequirement::UnitCompleted { lesson_id: None },
        ];
        for requirement in &requirements {
            assert!(!unlock_status_description(requirement).is_empty());
        }
    }
}
