use serde::Serialize;

use crate::content::{LessonSummary, RemediationLink};
use crate::progress::CompletionContext;

/// Which item list the session is walking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Phase {
    Core,
    #[serde(rename_all = "camelCase")]
    Challenge { set_id: String, set_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationOffer {
    pub item_id: String,
    pub link: RemediationLink,
    /// Missing when the link points at a lesson the catalog does not have.
    pub recommended_lesson: Option<LessonSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionState {
    #[serde(rename_all = "camelCase")]
    Presenting {
        item_id: String,
        step: Option<usize>,
    },
    AwaitingNextAfterCorrect,
    RemediationOffered(RemediationOffer),
    Finished,
}

impl SessionState {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Finished)
    }
}

/// Everything the UI needs to render one moment of a lesson.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub lesson: LessonSummary,
    pub state: SessionState,
    pub phase: Phase,
    pub item_index: usize,
    pub step_index: usize,
    pub item_id: Option<String>,
    pub prompt: Option<String>,
    pub choices: Vec<String>,
    pub core_correct: usize,
    pub completed_questions: usize,
    pub remaining_challenge_sets: Vec<String>,
    pub last_answer_correct: Option<bool>,
    pub revealed_hints: Vec<String>,
    pub finished: bool,
    pub celebrate_mastery: bool,
    pub completion: Option<CompletionContext>,
}
