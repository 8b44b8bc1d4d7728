mod event_bus;

pub use event_bus::{
    AssessmentCompletedPayload, AssessmentPresentedPayload, AssessmentSource, BadgeEarnedPayload,
    ChallengeSetPresentedPayload, EventBus, EventBusStats, EventEnvelope, EventSink,
    GoalProgressUpdatedPayload, HintShownPayload, LearningEvent, LessonCompletedPayload,
    LessonStartedPayload, QuestionAnsweredPayload, RemediationAcknowledgedPayload,
    RemediationSuggestedPayload, UnitUnlockedPayload,
};
