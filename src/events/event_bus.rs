use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::content::{AssessmentKind, GradeLevel};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum LearningEvent {
    #[serde(rename = "LESSON_STARTED")]
    LessonStarted(LessonStartedPayload),

    #[serde(rename = "QUESTION_ANSWERED")]
    QuestionAnswered(QuestionAnsweredPayload),

    #[serde(rename = "LESSON_COMPLETED")]
    LessonCompleted(LessonCompletedPayload),

    #[serde(rename = "ASSESSMENT_PRESENTED")]
    AssessmentPresented(AssessmentPresentedPayload),

    #[serde(rename = "ASSESSMENT_COMPLETED")]
    AssessmentCompleted(AssessmentCompletedPayload),

    #[serde(rename = "HINT_SHOWN")]
    HintShown(HintShownPayload),

    #[serde(rename = "REMEDIATION_SUGGESTED")]
    RemediationSuggested(RemediationSuggestedPayload),

    #[serde(rename = "REMEDIATION_ACKNOWLEDGED")]
    RemediationAcknowledged(RemediationAcknowledgedPayload),

    #[serde(rename = "CHALLENGE_SET_PRESENTED")]
    ChallengeSetPresented(ChallengeSetPresentedPayload),

    #[serde(rename = "BADGE_EARNED")]
    BadgeEarned(BadgeEarnedPayload),

    #[serde(rename = "UNIT_UNLOCKED")]
    UnitUnlocked(UnitUnlockedPayload),

    #[serde(rename = "GOAL_PROGRESS_UPDATED")]
    GoalProgressUpdated(GoalProgressUpdatedPayload),
}

impl LearningEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LearningEvent::LessonStarted(_) => "LESSON_STARTED",
            LearningEvent::QuestionAnswered(_) => "QUESTION_ANSWERED",
            LearningEvent::LessonCompleted(_) => "LESSON_COMPLETED",
            LearningEvent::AssessmentPresented(_) => "ASSESSMENT_PRESENTED",
            LearningEvent::AssessmentCompleted(_) => "ASSESSMENT_COMPLETED",
            LearningEvent::HintShown(_) => "HINT_SHOWN",
            LearningEvent::RemediationSuggested(_) => "REMEDIATION_SUGGESTED",
            LearningEvent::RemediationAcknowledged(_) => "REMEDIATION_ACKNOWLEDGED",
            LearningEvent::ChallengeSetPresented(_) => "CHALLENGE_SET_PRESENTED",
            LearningEvent::BadgeEarned(_) => "BADGE_EARNED",
            LearningEvent::UnitUnlocked(_) => "UNIT_UNLOCKED",
            LearningEvent::GoalProgressUpdated(_) => "GOAL_PROGRESS_UPDATED",
        }
    }

    pub fn lesson_id(&self) -> Option<&str> {
        match self {
            LearningEvent::LessonStarted(p) => Some(&p.lesson_id),
            LearningEvent::QuestionAnswered(p) => Some(&p.lesson_id),
            LearningEvent::LessonCompleted(p) => Some(&p.lesson_id),
            LearningEvent::AssessmentPresented(p) => Some(&p.lesson_id),
            LearningEvent::AssessmentCompleted(p) => p.lesson_id.as_deref(),
            LearningEvent::HintShown(p) => Some(&p.lesson_id),
            LearningEvent::RemediationSuggested(p) => Some(&p.lesson_id),
            LearningEvent::RemediationAcknowledged(p) => Some(&p.lesson_id),
            LearningEvent::ChallengeSetPresented(p) => Some(&p.lesson_id),
            LearningEvent::BadgeEarned(_) => None,
            LearningEvent::UnitUnlocked(p) => Some(&p.lesson_id),
            LearningEvent::GoalProgressUpdated(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStartedPayload {
    pub lesson_id: String,
    pub grade: GradeLevel,
    pub item_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnsweredPayload {
    pub lesson_id: String,
    pub item_id: String,
    pub step_index: Option<usize>,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletedPayload {
    pub lesson_id: String,
    pub grade: GradeLevel,
    pub passed_assessment: bool,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPresentedPayload {
    pub lesson_id: String,
    pub kind: AssessmentKind,
    pub mastery_threshold: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssessmentSource {
    QuickCheck,
    ExitTicket,
    Diagnostic,
}

impl From<AssessmentKind> for AssessmentSource {
    fn from(kind: AssessmentKind) -> Self {
        match kind {
            AssessmentKind::QuickCheck => AssessmentSource::QuickCheck,
            AssessmentKind::ExitTicket => AssessmentSource::ExitTicket,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentCompletedPayload {
    pub grade: GradeLevel,
    /// Absent for grade-level diagnostics.
    pub lesson_id: Option<String>,
    pub source: AssessmentSource,
    pub score: f64,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintShownPayload {
    pub lesson_id: String,
    pub item_id: String,
    pub hint_index: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationSuggestedPayload {
    pub lesson_id: String,
    pub item_id: String,
    pub prerequisite_lesson_id: String,
    pub recommended_available: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationAcknowledgedPayload {
    pub lesson_id: String,
    pub item_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSetPresentedPayload {
    pub lesson_id: String,
    pub challenge_set_id: String,
    pub core_correct: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeEarnedPayload {
    pub grade: GradeLevel,
    pub badge_id: String,
    /// Lesson or playlist that earned the badge.
    pub source_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitUnlockedPayload {
    pub grade: GradeLevel,
    pub lesson_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgressUpdatedPayload {
    pub grade: GradeLevel,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub overall_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

/// Fire-and-forget analytics output. Nothing the core does depends on
/// what a sink does with an event.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LearningEvent);
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub id: String,
    pub event: LearningEvent,
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event: LearningEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            created_at: Utc::now(),
        }
    }
}

type SubscriberId = String;

struct Subscriber {
    lesson_id: Option<String>,
    event_types: Option<Vec<String>>,
    sender: broadcast::Sender<EventEnvelope>,
}

impl Subscriber {
    fn matches(&self, envelope: &EventEnvelope) -> bool {
        if let Some(ref lesson_id) = self.lesson_id {
            if envelope.event.lesson_id() != Some(lesson_id.as_str()) {
                return false;
            }
        }

        if let Some(ref event_types) = self.event_types {
            if !event_types.iter().any(|t| t == envelope.event.event_type()) {
                return false;
            }
        }

        true
    }
}

/// In-process fan-out of learning events to analytics transports and UI.
pub struct EventBus {
    global_sender: broadcast::Sender<EventEnvelope>,
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
    event_count: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        let (global_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            global_sender,
            subscribers: RwLock::new(HashMap::new()),
            event_count: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: LearningEvent) {
        let envelope = EventEnvelope::new(event);
        let event_type = envelope.event.event_type();

        self.event_count.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.subscribers.read();
        let mut sent_count = 0usize;

        for subscriber in subscribers.values() {
            if subscriber.matches(&envelope) && subscriber.sender.send(envelope.clone()).is_ok() {
                sent_count += 1;
            }
        }

        if self.global_sender.send(envelope.clone()).is_err() {
            debug!("No global subscribers for event");
        }

        debug!(
            event_type = event_type,
            lesson_id = envelope.event.lesson_id().unwrap_or("-"),
            sent_to = sent_count,
            "Event published"
        );
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<EventEnvelope> {
        self.global_sender.subscribe()
    }

    pub fn subscribe_filtered(
        &self,
        lesson_id: Option<String>,
        event_types: Option<Vec<String>>,
    ) -> (SubscriberId, broadcast::Receiver<EventEnvelope>) {
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let subscriber_id = uuid::Uuid::new_v4().to_string();

        self.subscribers.write().insert(
            subscriber_id.clone(),
            Subscriber {
                lesson_id,
                event_types,
                sender,
            },
        );

        debug!(subscriber_id = %subscriber_id, "New filtered subscription created");

        (subscriber_id, receiver)
    }

    pub fn unsubscribe(&self, subscriber_id: &str) {
        if self.subscribers.write().remove(subscriber_id).is_some() {
            debug!(subscriber_id = %subscriber_id, "Subscription removed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len() + self.global_sender.receiver_count()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            total_events: self.event_count(),
            subscriber_count: self.subscriber_count(),
            global_subscribers: self.global_sender.receiver_count(),
            filtered_subscribers: self.subscribers.read().len(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: LearningEvent) {
        self.publish(event);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventBusStats {
    pub total_events: u64,
    pub subscriber_count: usize,
    pub global_subscribers: usize,
    pub filtered_subscribers: usize,
}
