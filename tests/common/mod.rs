#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use ax_progression::content::{
    Assessment, AssessmentKind, Badge, ChallengeSet, GradeLevel, InMemoryContent, InteractionKind,
    Item, Lesson, Playlist, RemediationLink, Step, UnlockRequirement,
};
use ax_progression::events::{EventSink, LearningEvent};
use ax_progression::progress::InMemoryProgressStore;
use ax_progression::session::{AdvanceDispatch, AdvanceScheduler, AdvanceTicket};
use ax_progression::Services;

pub type TestServices = Services<InMemoryContent, InMemoryProgressStore, RecordingSink>;

// ============================================================================
// Collaborators
// ============================================================================

/// Keeps every emitted event in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LearningEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<LearningEvent> {
        self.events.lock().clone()
    }

    pub fn types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(LearningEvent::event_type).collect()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LearningEvent) {
        self.events.lock().push(event);
    }
}

/// Defers every advance; the test decides when tickets fire.
#[derive(Debug, Clone, Default)]
pub struct QueuedScheduler {
    tickets: Arc<Mutex<Vec<AdvanceTicket>>>,
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl QueuedScheduler {
    pub fn take(&self) -> Vec<AdvanceTicket> {
        std::mem::take(&mut *self.tickets.lock())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

impl AdvanceScheduler for QueuedScheduler {
    fn schedule(&self, delay: Duration, ticket: AdvanceTicket) -> AdvanceDispatch {
        self.delays.lock().push(delay);
        self.tickets.lock().push(ticket);
        AdvanceDispatch::Deferred
    }
}

pub fn services(lessons: Vec<Lesson>, playlists: Vec<Playlist>) -> TestServices {
    Services::new(
        Arc::new(InMemoryContent::new(lessons, playlists)),
        Arc::new(InMemoryProgressStore::new()),
        Arc::new(RecordingSink::default()),
    )
}

// ============================================================================
// Content fixtures
// ============================================================================

/// Three-choice item whose answer is `correct`.
pub fn item(id: &str, correct: usize) -> Item {
    Item {
        id: id.to_string(),
        prompt: format!("Question {id}"),
        choices: vec!["1".into(), "2".into(), "3".into()],
        correct_index: correct,
        steps: Vec::new(),
        hints: Vec::new(),
        voice_prompt: None,
        tactile_guidance: None,
        kind: InteractionKind::MultipleChoice,
    }
}

pub fn item_with_hints(id: &str, hints: &[&str]) -> Item {
    Item {
        hints: hints.iter().map(|h| h.to_string()).collect(),
        ..item(id, 0)
    }
}

/// Word problem with two steps keyed 1 then 0.
pub fn two_step_item(id: &str) -> Item {
    Item {
        kind: InteractionKind::WordProblem,
        steps: vec![
            Step {
                prompt: "How many apples at first?".into(),
                choices: vec!["2".into(), "3".into()],
                correct_index: 1,
                hint: Some("Look at the first basket".into()),
            },
            Step {
                prompt: "How many after adding 2?".into(),
                choices: vec!["5".into(), "6".into()],
                correct_index: 0,
                hint: None,
            },
        ],
        ..item(id, 0)
    }
}

pub fn lesson(id: &str, grade: GradeLevel, items: Vec<Item>) -> Lesson {
    Lesson {
        id: id.to_string(),
        title: format!("Lesson {id}"),
        description: String::new(),
        grade,
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

/// Lesson of `n` items, each keyed to choice 0.
pub fn simple_lesson(id: &str, grade: GradeLevel, n: usize) -> Lesson {
    let items = (0..n).map(|i| item(&format!("{id}-q{i}"), 0)).collect();
    lesson(id, grade, items)
}

pub fn challenge_set(id: &str, threshold: usize, items: Vec<Item>) -> ChallengeSet {
    ChallengeSet {
        id: id.to_string(),
        title: format!("Challenge {id}"),
        items,
        threshold,
    }
}

pub fn remediation(prerequisite: &str, item_ids: &[&str]) -> RemediationLink {
    RemediationLink {
        prerequisite_lesson_id: prerequisite.to_string(),
        message: "Let's review this first".into(),
        item_ids: item_ids.iter().map(|id| id.to_string()).collect::<BTreeSet<_>>(),
    }
}

pub fn quick_check(threshold: f64) -> Assessment {
    Assessment {
        kind: AssessmentKind::QuickCheck,
        mastery_threshold: threshold,
        minimum_items: 0,
    }
}

pub fn badge(id: &str) -> Badge {
    Badge {
        id: id.to_string(),
        title: format!("Badge {id}"),
        description: String::new(),
    }
}

pub fn playlist(
    id: &str,
    grade: GradeLevel,
    lesson_ids: &[&str],
    badge: Option<Badge>,
) -> Playlist {
    Playlist {
        id: id.to_string(),
        title: format!("Playlist {id}"),
        grade,
        lesson_ids: lesson_ids.iter().map(|id| id.to_string()).collect(),
        badge,
    }
}
