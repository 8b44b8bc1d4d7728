use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::{
    validate_lesson, ContentIntegrityError, ContentProvider, GradeLevel, Item, Lesson,
    LessonSummary,
};
use crate::evaluator;
use crate::events::{
    AssessmentPresentedPayload, ChallengeSetPresentedPayload, EventSink, HintShownPayload,
    LearningEvent, LessonStartedPayload, QuestionAnsweredPayload, RemediationAcknowledgedPayload,
    RemediationSuggestedPayload,
};
use crate::progress::{CompletionContext, ProgressAggregator, ProgressStore};
use crate::services::Services;

use super::scheduler::{AdvanceDispatch, AdvanceScheduler, AdvanceTicket, ImmediateScheduler};
use super::snapshot::{Phase, RemediationOffer, SessionSnapshot, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("an advance to the next item is already pending")]
    AdvancePending,
    #[error("the remediation suggestion must be acknowledged first")]
    RemediationPending,
    #[error("the lesson is already finished")]
    Finished,
    #[error("no remediation is being offered")]
    NoRemediation,
    #[error("no advance is pending")]
    NoPendingAdvance,
}

/// One learner's pass through a lesson.
///
/// Walks the core items, then any challenge sets whose thresholds were met,
/// and records the outcome exactly once when it finishes. Dropping the
/// session abandons it without persisting anything.
pub struct LessonSession<C, P, E, S = ImmediateScheduler> {
    services: Services<C, P, E>,
    scheduler: S,
    advance_delay: Duration,
    lesson: Lesson,
    state: SessionState,
    phase: Phase,
    item_index: usize,
    step_index: usize,
    /// Core items answered correctly, retries included. Gates challenge sets
    /// and feeds the assessment score.
    core_correct: usize,
    /// Items of any phase answered correctly without a miss. Only recorded
    /// in the lesson stats.
    first_try_correct: usize,
    completed_questions: usize,
    item_missed: bool,
    remaining_challenge_sets: Vec<usize>,
    last_answer_correct: Option<bool>,
    hints_revealed: HashMap<String, usize>,
    pending_advance: Option<AdvanceTicket>,
    next_ticket: u64,
    celebrate_mastery: bool,
    completion: Option<CompletionContext>,
}

impl<C, P, E> LessonSession<C, P, E, ImmediateScheduler>
where
    C: ContentProvider,
    P: ProgressStore,
    E: EventSink,
{
    /// Session that advances inline after every correct answer.
    pub fn immediate(
        services: Services<C, P, E>,
        lesson: Lesson,
    ) -> Result<Self, ContentIntegrityError> {
        Self::start(services, lesson, ImmediateScheduler, Duration::ZERO)
    }
}

impl<C, P, E, S> LessonSession<C, P, E, S>
where
    C: ContentProvider,
    P: ProgressStore,
    E: EventSink,
    S: AdvanceScheduler,
{
    pub fn start(
        services: Services<C, P, E>,
        lesson: Lesson,
        scheduler: S,
        advance_delay: Duration,
    ) -> Result<Self, ContentIntegrityError> {
        validate_lesson(&lesson)?;

        services.events.emit(LearningEvent::LessonStarted(LessonStartedPayload {
            lesson_id: lesson.id.clone(),
            grade: lesson.grade,
            item_count: lesson.items.len(),
            timestamp: Utc::now(),
        }));
        if let Some(assessment) = &lesson.assessment {
            services
                .events
                .emit(LearningEvent::AssessmentPresented(AssessmentPresentedPayload {
                    lesson_id: lesson.id.clone(),
                    kind: assessment.kind,
                    mastery_threshold: assessment.mastery_threshold,
                    timestamp: Utc::now(),
                }));
        }

        let first = &lesson.items[0];
        let state = SessionState::Presenting {
            item_id: first.id.clone(),
            step: first.has_steps().then_some(0),
        };
        debug!(lesson_id = %lesson.id, items = lesson.items.len(), "lesson session started");

        Ok(Self {
            services,
            scheduler,
            advance_delay,
            remaining_challenge_sets: (0..lesson.challenge_sets.len()).collect(),
            lesson,
            state,
            phase: Phase::Core,
            item_index: 0,
            step_index: 0,
            core_correct: 0,
            first_try_correct: 0,
            completed_questions: 0,
            item_missed: false,
            last_answer_correct: None,
            hints_revealed: HashMap::new(),
            pending_advance: None,
            next_ticket: 0,
            celebrate_mastery: false,
            completion: None,
        })
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn item_index(&self) -> usize {
        self.item_index
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn core_correct(&self) -> usize {
        self.core_correct
    }

    pub fn completed_questions(&self) -> usize {
        self.completed_questions
    }

    pub fn last_answer_correct(&self) -> Option<bool> {
        self.last_answer_correct
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn celebrate_mastery(&self) -> bool {
        self.celebrate_mastery
    }

    pub fn completion(&self) -> Option<&CompletionContext> {
        self.completion.as_ref()
    }

    pub fn hints_revealed(&self, item_id: &str) -> usize {
        self.hints_revealed.get(item_id).copied().unwrap_or(0)
    }

    pub fn pending_advance(&self) -> Option<&AdvanceTicket> {
        self.pending_advance.as_ref()
    }

    fn current_items(&self) -> &[Item] {
        match &self.phase {
            Phase::Core => &self.lesson.items,
            Phase::Challenge { set_index, .. } => self
                .lesson
                .challenge_sets
                .get(*set_index)
                .map(|set| set.items.as_slice())
                .unwrap_or(&[]),
        }
    }

    pub fn current_item(&self) -> Option<&Item> {
        if self.state.is_finished() {
            return None;
        }
        self.current_items().get(self.item_index)
    }

    fn ensure_presenting(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Presenting { .. } => Ok(()),
            SessionState::AwaitingNextAfterCorrect => Err(SessionError::AdvancePending),
            SessionState::RemediationOffered(_) => Err(SessionError::RemediationPending),
            SessionState::Finished => Err(SessionError::Finished),
        }
    }

    /// Submits a choice for the item (or step) on screen.
    pub fn answer(&mut self, choice_index: usize) -> Result<SessionSnapshot, SessionError> {
        self.ensure_presenting()?;
        let Some(item) = self.current_item().cloned() else {
            return Err(SessionError::Finished);
        };

        let step = item.has_steps().then_some(self.step_index);
        let correct = evaluator::is_correct(&item, choice_index, step);
        self.last_answer_correct = Some(correct);

        self.services
            .events
            .emit(LearningEvent::QuestionAnswered(QuestionAnsweredPayload {
                lesson_id: self.lesson.id.clone(),
                item_id: item.id.clone(),
                step_index: step,
                is_correct: correct,
                timestamp: Utc::now(),
            }));
        debug!(lesson_id = %self.lesson.id, item_id = %item.id, ?step, correct, "answer evaluated");

        if !correct {
            self.item_missed = true;
            self.handle_miss(&item);
            return Ok(self.snapshot());
        }

        self.hints_revealed.remove(&item.id);

        if self.step_index + 1 < item.steps.len() {
            self.step_index += 1;
            self.present();
            return Ok(self.snapshot());
        }

        if !self.item_missed {
            self.first_try_correct += 1;
        }
        if self.phase == Phase::Core {
            self.core_correct += 1;
        }
        self.completed_questions += 1;
        self.state = SessionState::AwaitingNextAfterCorrect;
        self.schedule_advance();
        Ok(self.snapshot())
    }

    /// Applies the pending advance right away, cancelling its timer.
    pub fn advance(&mut self) -> Result<SessionSnapshot, SessionError> {
        match self.state {
            SessionState::AwaitingNextAfterCorrect => {}
            SessionState::Finished => return Err(SessionError::Finished),
            _ => return Err(SessionError::NoPendingAdvance),
        }
        if let Some(ticket) = self.pending_advance.take() {
            ticket.cancel();
        }
        self.apply_advance();
        Ok(self.snapshot())
    }

    /// Delivers a scheduled advance. Stale or cancelled tickets are ignored,
    /// so each correct answer advances at most once.
    pub fn fire(&mut self, ticket: &AdvanceTicket) -> Option<SessionSnapshot> {
        let matches = self
            .pending_advance
            .as_ref()
            .is_some_and(|pending| pending.id() == ticket.id() && !pending.is_cancelled());
        if !matches {
            debug!(ticket = ticket.id(), "ignoring stale advance ticket");
            return None;
        }
        self.pending_advance = None;
        self.apply_advance();
        Some(self.snapshot())
    }

    pub fn acknowledge_remediation(&mut self) -> Result<SessionSnapshot, SessionError> {
        let SessionState::RemediationOffered(offer) = &self.state else {
            return Err(SessionError::NoRemediation);
        };

        self.services
            .events
            .emit(LearningEvent::RemediationAcknowledged(RemediationAcknowledgedPayload {
                lesson_id: self.lesson.id.clone(),
                item_id: offer.item_id.clone(),
                timestamp: Utc::now(),
            }));

        self.last_answer_correct = None;
        self.present();
        Ok(self.snapshot())
    }

    /// Reveals the next hint on request, up to the end of the hint list.
    pub fn reveal_hint(&mut self) -> Result<SessionSnapshot, SessionError> {
        self.ensure_presenting()?;
        if let Some(item) = self.current_item().cloned() {
            self.reveal_next_hint(&item);
        }
        Ok(self.snapshot())
    }

    fn schedule_advance(&mut self) {
        self.next_ticket += 1;
        let ticket = AdvanceTicket::new(self.next_ticket);
        match self.scheduler.schedule(self.advance_delay, ticket.clone()) {
            AdvanceDispatch::Immediate => self.apply_advance(),
            AdvanceDispatch::Deferred => self.pending_advance = Some(ticket),
        }
    }

    fn apply_advance(&mut self) {
        self.step_index = 0;
        self.item_missed = false;
        self.last_answer_correct = None;

        if self.item_index + 1 < self.current_items().len() {
            self.item_index += 1;
            self.present();
            return;
        }

        if let Some(position) = self.next_challenge_set() {
            let set_index = self.remaining_challenge_sets.remove(position);
            let set_id = self.lesson.challenge_sets[set_index].id.clone();

            self.services
                .events
                .emit(LearningEvent::ChallengeSetPresented(ChallengeSetPresentedPayload {
                    lesson_id: self.lesson.id.clone(),
                    challenge_set_id: set_id.clone(),
                    core_correct: self.core_correct,
                    timestamp: Utc::now(),
                }));
            info!(
                lesson_id = %self.lesson.id,
                challenge_set_id = %set_id,
                "challenge set unlocked"
            );

            self.phase = Phase::Challenge { set_id, set_index };
            self.item_index = 0;
            self.present();
            return;
        }

        self.finish();
    }

    /// First unconsumed set, in authored order, whose threshold is met.
    fn next_challenge_set(&self) -> Option<usize> {
        self.remaining_challenge_sets.iter().position(|&index| {
            self.lesson
                .challenge_sets
                .get(index)
                .is_some_and(|set| set.threshold <= self.core_correct && !set.items.is_empty())
        })
    }

    fn present(&mut self) {
        let Some(item) = self.current_items().get(self.item_index) else {
            self.finish();
            return;
        };
        self.state = SessionState::Presenting {
            item_id: item.id.clone(),
            step: item.has_steps().then_some(self.step_index),
        };
    }

    fn handle_miss(&mut self, item: &Item) {
        if let Some(link) = self.lesson.remediation_for(&item.id).cloned() {
            let recommended = self.resolve_prerequisite(&link.prerequisite_lesson_id);
            if recommended.is_none() {
                warn!(
                    lesson_id = %self.lesson.id,
                    prerequisite = %link.prerequisite_lesson_id,
                    "remediation target not found, showing message only"
                );
            }

            self.services
                .events
                .emit(LearningEvent::RemediationSuggested(RemediationSuggestedPayload {
                    lesson_id: self.lesson.id.clone(),
                    item_id: item.id.clone(),
                    prerequisite_lesson_id: link.prerequisite_lesson_id.clone(),
                    recommended_available: recommended.is_some(),
                    timestamp: Utc::now(),
                }));

            self.state = SessionState::RemediationOffered(RemediationOffer {
                item_id: item.id.clone(),
                link,
                recommended_lesson: recommended,
            });
            return;
        }

        if self.lesson.remediation_links.is_empty() {
            self.reveal_next_hint(item);
        }
    }

    fn reveal_next_hint(&mut self, item: &Item) -> bool {
        let available = item.hint_ladder(self.step_index).len();
        let revealed = self.hints_revealed.entry(item.id.clone()).or_insert(0);
        if *revealed >= available {
            return false;
        }
        *revealed += 1;
        let hint_index = *revealed - 1;

        self.services.events.emit(LearningEvent::HintShown(HintShownPayload {
            lesson_id: self.lesson.id.clone(),
            item_id: item.id.clone(),
            hint_index,
            timestamp: Utc::now(),
        }));
        true
    }

    fn resolve_prerequisite(&self, lesson_id: &str) -> Option<LessonSummary> {
        let content = &self.services.content;
        let candidates = match self.lesson.grade.prerequisite() {
            Some(GradeLevel::Kindergarten) => content.kindergarten_lessons(),
            Some(grade) => content.lessons_for_grade(grade),
            None => content.lessons_for_grade(self.lesson.grade),
        };
        candidates
            .iter()
            .find(|lesson| lesson.id == lesson_id)
            .map(Lesson::summary)
    }

    fn finish(&mut self) {
        let core_total = self.lesson.items.len();
        let score = if core_total == 0 {
            0.0
        } else {
            self.core_correct as f64 / core_total as f64
        };
        let passed = self
            .lesson
            .assessment
            .as_ref()
            .map_or(true, |assessment| assessment.is_passed(score, core_total));

        let ctx = CompletionContext {
            lesson: self.lesson.summary(),
            passed_assessment: passed,
            assessment_kind: self.lesson.assessment.as_ref().map(|a| a.kind),
            score: self.lesson.assessment.as_ref().map(|_| score),
            correct_answers: self.first_try_correct as u32,
            total_questions: self.completed_questions as u32,
            badge: self.lesson.badge.clone(),
            playlist_id: self.lesson.playlist_id.clone(),
        };

        self.state = SessionState::Finished;
        self.celebrate_mastery = passed;
        ProgressAggregator::new(self.services.clone()).record_completion(&ctx);
        info!(lesson_id = %self.lesson.id, score, passed, "lesson finished");
        self.completion = Some(ctx);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let item = self.current_item();
        let revealed_hints = item
            .map(|item| {
                let count = self.hints_revealed(&item.id);
                item.hint_ladder(self.step_index)
                    .into_iter()
                    .take(count)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        SessionSnapshot {
            lesson: self.lesson.summary(),
            state: self.state.clone(),
            phase: self.phase.clone(),
            item_index: self.item_index,
            step_index: self.step_index,
            item_id: item.map(|item| item.id.clone()),
            prompt: item.map(|item| item.prompt_at(self.step_index).to_string()),
            choices: item
                .map(|item| item.choices_at(self.step_index).to_vec())
                .unwrap_or_default(),
            core_correct: self.core_correct,
            completed_questions: self.completed_questions,
            remaining_challenge_sets: self
                .remaining_challenge_sets
                .iter()
                .filter_map(|&index| self.lesson.challenge_sets.get(index))
                .map(|set| set.id.clone())
                .collect(),
            last_answer_correct: self.last_answer_correct,
            revealed_hints,
            finished: self.state.is_finished(),
            celebrate_mastery: self.celebrate_mastery,
            completion: self.completion.clone(),
        }
    }
}

impl<C, P, E, S> Drop for LessonSession<C, P, E, S> {
    fn drop(&mut self) {
        if let Some(ticket) = self.pending_advance.take() {
            ticket.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::content::{InMemoryContent, InteractionKind, UnlockRequirement};
    use crate::events::EventBus;
    use crate::progress::InMemoryProgressStore;

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            prompt: format!("What is {id}?"),
            choices: vec!["right".into(), "wrong".into()],
            correct_index: 0,
            steps: Vec::new(),
            hints: Vec::new(),
            voice_prompt: None,
            tactile_guidance: None,
            kind: InteractionKind::MultipleChoice,
        }
    }

    fn lesson(items: Vec<Item>) -> Lesson {
        Lesson {
            id: "k-count-1".into(),
            title: "Counting to 5".into(),
            description: String::new(),
            grade: GradeLevel::Kindergarten,
            topic: "counting".into(),
            items,
            challenge_sets: Vec::new(),
            remediation_links: Vec::new(),
            unlock: UnlockRequirement::Always,
            assessment: None,
            badge: None,
            playlist_id: None,
            playlist_position: None,
            strand_id: None,
            variant: None,
            difficulty: None,
            objectives: Vec::new(),
        }
    }

    fn services(lesson: &Lesson) -> Services<InMemoryContent, InMemoryProgressStore, EventBus> {
        Services::new(
            Arc::new(InMemoryContent::new(vec![lesson.clone()], Vec::new())),
            Arc::new(InMemoryProgressStore::new()),
            Arc::new(EventBus::new()),
        )
    }

    #[test]
    fn empty_lesson_cannot_start() {
        let l = lesson(Vec::new());
        let result = LessonSession::immediate(services(&l), l);
        assert!(matches!(result, Err(ContentIntegrityError::EmptyLesson { .. })));
    }

    #[test]
    fn retry_counts_for_core_but_not_first_try() {
        let l = lesson(vec![item("q1"), item("q2")]);
        let mut session = LessonSession::immediate(services(&l), l).unwrap();

        let snap = session.answer(1).unwrap();
        assert_eq!(snap.last_answer_correct, Some(false));
        assert_eq!(snap.item_index, 0);

        session.answer(0).unwrap();
        session.answer(0).unwrap();

        assert!(session.is_finished());
        assert_eq!(session.completed_questions(), 2);
        assert_eq!(session.core_correct(), 2);
        let ctx = session.completion().unwrap();
        assert_eq!((ctx.correct_answers, ctx.total_questions), (1, 2));
        assert!(ctx.passed_assessment);
    }

    #[test]
    fn finished_session_rejects_everything() {
        let l = lesson(vec![item("q1")]);
        let mut session = LessonSession::immediate(services(&l), l).unwrap();
        session.answer(0).unwrap();

        assert_eq!(session.answer(0), Err(SessionError::Finished));
        assert_eq!(session.advance(), Err(SessionError::Finished));
        assert_eq!(session.acknowledge_remediation(), Err(SessionError::NoRemediation));
        assert!(session.snapshot().item_id.is_none());
    }

    #[test]
    fn manual_hint_requests_are_capped() {
        let mut q = item("q1");
        q.hints = vec!["one".into(), "two".into()];
        let l = lesson(vec![q]);
        let mut session = LessonSession::immediate(services(&l), l).unwrap();

        session.reveal_hint().unwrap();
        session.reveal_hint().unwrap();
        let snap = session.reveal_hint().unwrap();
        assert_eq!(snap.revealed_hints, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(session.hints_revealed("q1"), 2);
    }
}
