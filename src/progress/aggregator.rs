use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::content::{AssessmentKind, Badge, ContentProvider, GradeLevel, LessonSummary, Playlist};
use crate::events::{
    AssessmentCompletedPayload, AssessmentSource, BadgeEarnedPayload, EventSink,
    GoalProgressUpdatedPayload, LearningEvent, LessonCompletedPayload, UnitUnlockedPayload,
};
use crate::gating::GatingEvaluator;
use crate::services::Services;

use super::store::{LessonStats, ProgressStore};

/// Outcome of one finished lesson attempt, handed to the progress store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionContext {
    pub lesson: LessonSummary,
    /// `true` when the lesson has no assessment.
    pub passed_assessment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_kind: Option<AssessmentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub correct_answers: u32,
    pub total_questions: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeProgress {
    pub grade: GradeLevel,
    pub completed_lesson_count: usize,
    pub total_lesson_count: usize,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub overall_accuracy: f64,
}

impl GradeProgress {
    pub fn completion_ratio(&self) -> f64 {
        if self.total_lesson_count == 0 {
            return 0.0;
        }
        self.completed_lesson_count as f64 / self.total_lesson_count as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistProgress {
    pub playlist_id: String,
    pub completed_count: usize,
    pub total_count: usize,
    pub all_assessments_mastered: bool,
}

impl PlaylistProgress {
    pub fn is_complete(&self) -> bool {
        self.total_count > 0 && self.completed_count == self.total_count
    }
}

/// Read models over persisted progress, plus the write path taken when a
/// lesson or diagnostic finishes.
pub struct ProgressAggregator<C, P, E> {
    services: Services<C, P, E>,
}

impl<C, P, E> ProgressAggregator<C, P, E>
where
    C: ContentProvider,
    P: ProgressStore,
    E: EventSink,
{
    pub fn new(services: Services<C, P, E>) -> Self {
        Self { services }
    }

    fn gating(&self) -> GatingEvaluator<'_, C, P> {
        GatingEvaluator::new(&*self.services.content, &*self.services.progress)
    }

    pub fn grade_progress(&self, grade: GradeLevel) -> GradeProgress {
        let store = &self.services.progress;
        let lessons = self.services.content.lessons_for_grade(grade);

        let mut completed = 0usize;
        let mut totals = LessonStats::default();
        for lesson in &lessons {
            if store.completion_flag(grade, &lesson.id) {
                completed += 1;
            }
            if let Some(stats) = store.lesson_stats(grade, &lesson.id) {
                totals = LessonStats {
                    correct_answers: totals.correct_answers.saturating_add(stats.correct_answers),
                    total_questions: totals.total_questions.saturating_add(stats.total_questions),
                    attempts: totals.attempts.saturating_add(stats.attempts),
                };
            }
        }

        let overall_accuracy = if totals.total_questions == 0 {
            0.0
        } else {
            totals.correct_answers as f64 / totals.total_questions as f64
        };

        GradeProgress {
            grade,
            completed_lesson_count: completed,
            total_lesson_count: lessons.len(),
            correct_answers: totals.correct_answers,
            total_questions: totals.total_questions,
            overall_accuracy,
        }
    }

    pub fn playlist_progress(&self, playlist: &Playlist) -> PlaylistProgress {
        let store = &self.services.progress;
        let completed_count = playlist
            .lesson_ids
            .iter()
            .filter(|id| store.completion_flag(playlist.grade, id))
            .count();

        let all_assessments_mastered = playlist.lesson_ids.iter().all(|id| {
            match self.services.content.lesson(id) {
                Some(lesson) if lesson.assessment.is_some() => {
                    store.assessment_passed(lesson.grade, id)
                }
                Some(lesson) => store.completion_flag(lesson.grade, id),
                None => false,
            }
        });

        PlaylistProgress {
            playlist_id: playlist.id.clone(),
            completed_count,
            total_count: playlist.lesson_ids.len(),
            all_assessments_mastered,
        }
    }

    /// Awards `badge` once. Returns `true` only on the call that set the flag.
    pub fn award_badge(&self, grade: GradeLevel, badge: &Badge, source_id: &str) -> bool {
        let store = &self.services.progress;
        if store.badge_earned(grade, &badge.id) {
            debug!(badge_id = %badge.id, "badge already earned, skipping");
            return false;
        }

        store.set_badge_earned(grade, &badge.id, true);
        self.services
            .events
            .emit(LearningEvent::BadgeEarned(BadgeEarnedPayload {
                grade,
                badge_id: badge.id.clone(),
                source_id: source_id.to_string(),
                timestamp: Utc::now(),
            }));
        info!(badge_id = %badge.id, source_id = %source_id, "badge earned");
        true
    }

    /// Awards the playlist badge when every lesson is complete and mastered.
    pub fn evaluate_playlist_badge(&self, playlist: &Playlist) -> bool {
        let Some(badge) = &playlist.badge else {
            return false;
        };
        let progress = self.playlist_progress(playlist);
        if !progress.is_complete() || !progress.all_assessments_mastered {
            return false;
        }
        self.award_badge(playlist.grade, badge, &playlist.id)
    }

    /// Persists a finished lesson and emits the resulting events.
    pub fn record_completion(&self, ctx: &CompletionContext) {
        let store = &self.services.progress;
        let events = &self.services.events;
        let grade = ctx.lesson.grade;
        let lesson_id = ctx.lesson.id.as_str();
        let unlocked_before = self.gating().unlocked_lesson_ids();

        store.set_completion_flag(grade, lesson_id, true);

        if let Some(kind) = ctx.assessment_kind {
            if ctx.passed_assessment && !store.assessment_passed(grade, lesson_id) {
                store.set_assessment_passed(grade, lesson_id, true);
            }
            events.emit(LearningEvent::AssessmentCompleted(AssessmentCompletedPayload {
                grade,
                lesson_id: Some(lesson_id.to_string()),
                source: AssessmentSource::from(kind),
                score: ctx.score.unwrap_or(0.0),
                passed: ctx.passed_assessment,
                timestamp: Utc::now(),
            }));
        }

        let stats = store
            .lesson_stats(grade, lesson_id)
            .unwrap_or_default()
            .accumulate(ctx.correct_answers, ctx.total_questions);
        store.set_lesson_stats(grade, lesson_id, stats);

        if ctx.passed_assessment {
            if let Some(badge) = &ctx.badge {
                self.award_badge(grade, badge, lesson_id);
            }
        }

        if let Some(playlist) = ctx
            .playlist_id
            .as_deref()
            .and_then(|id| self.services.content.playlist(id))
        {
            self.evaluate_playlist_badge(&playlist);
        }

        events.emit(LearningEvent::LessonCompleted(LessonCompletedPayload {
            lesson_id: lesson_id.to_string(),
            grade,
            passed_assessment: ctx.passed_assessment,
            correct_answers: ctx.correct_answers,
            total_questions: ctx.total_questions,
            timestamp: Utc::now(),
        }));

        let progress = self.grade_progress(grade);
        events.emit(LearningEvent::GoalProgressUpdated(GoalProgressUpdatedPayload {
            grade,
            completed_lessons: progress.completed_lesson_count,
            total_lessons: progress.total_lesson_count,
            overall_accuracy: progress.overall_accuracy,
            timestamp: Utc::now(),
        }));

        self.emit_unlocks(&unlocked_before);

        info!(
            lesson_id = %lesson_id,
            grade = %grade,
            passed = ctx.passed_assessment,
            correct = ctx.correct_answers,
            total = ctx.total_questions,
            "lesson completion recorded"
        );
    }

    /// Records a placement check for `grade`. A pass is never revoked by a
    /// later failing attempt.
    pub fn record_diagnostic(
        &self,
        grade: GradeLevel,
        correct: u32,
        total: u32,
        threshold: f64,
    ) -> bool {
        let store = &self.services.progress;
        let score = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        };
        let passed = total > 0 && score >= threshold;
        let unlocked_before = self.gating().unlocked_lesson_ids();

        if passed && !store.diagnostic_passed(grade) {
            store.set_diagnostic_passed(grade, true);
        }

        self.services
            .events
            .emit(LearningEvent::AssessmentCompleted(AssessmentCompletedPayload {
                grade,
                lesson_id: None,
                source: AssessmentSource::Diagnostic,
                score,
                passed,
                timestamp: Utc::now(),
            }));

        self.emit_unlocks(&unlocked_before);
        info!(grade = %grade, score, passed, "diagnostic recorded");
        passed
    }

    fn emit_unlocks(&self, before: &BTreeSet<String>) {
        let gating = self.gating();
        for grade in GradeLevel::ALL {
            for unit in gating.unit_map(grade) {
                if unit.unlocked && !before.contains(&unit.lesson.id) {
                    debug!(lesson_id = %unit.lesson.id, "unit unlocked");
                    self.services
                        .events
                        .emit(LearningEvent::UnitUnlocked(UnitUnlockedPayload {
                            grade,
                            lesson_id: unit.lesson.id,
                            timestamp: Utc::now(),
                        }));
                }
            }
        }
    }
}
