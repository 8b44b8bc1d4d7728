use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::content::GradeLevel;

/// Aggregated answer counters for one lesson. Only totals are kept, never
/// individual answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStats {
    pub correct_answers: u32,
    pub total_questions: u32,
    pub attempts: u32,
}

impl LessonStats {
    pub fn accumulate(self, correct_answers: u32, total_questions: u32) -> Self {
        Self {
            correct_answers: self.correct_answers.saturating_add(correct_answers),
            total_questions: self.total_questions.saturating_add(total_questions),
            attempts: self.attempts.saturating_add(1),
        }
    }
}

/// Persisted learner progress, owned by the host's key-value storage.
///
/// Entries are created on first write and overwritten afterwards; nothing
/// is ever deleted. Unknown keys read as `false` / `None`.
pub trait ProgressStore: Send + Sync {
    fn completion_flag(&self, grade: GradeLevel, lesson_id: &str) -> bool;
    fn set_completion_flag(&self, grade: GradeLevel, lesson_id: &str, completed: bool);

    fn badge_earned(&self, grade: GradeLevel, badge_id: &str) -> bool;
    fn set_badge_earned(&self, grade: GradeLevel, badge_id: &str, earned: bool);

    fn diagnostic_passed(&self, grade: GradeLevel) -> bool;
    fn set_diagnostic_passed(&self, grade: GradeLevel, passed: bool);

    fn assessment_passed(&self, grade: GradeLevel, lesson_id: &str) -> bool;
    fn set_assessment_passed(&self, grade: GradeLevel, lesson_id: &str, passed: bool);

    fn lesson_stats(&self, grade: GradeLevel, lesson_id: &str) -> Option<LessonStats>;
    fn set_lesson_stats(&self, grade: GradeLevel, lesson_id: &str, stats: LessonStats);
}

fn completion_key(grade: GradeLevel, lesson_id: &str) -> String {
    format!("{grade}.lesson.{lesson_id}.completed")
}

fn badge_key(grade: GradeLevel, badge_id: &str) -> String {
    format!("{grade}.badge.{badge_id}.earned")
}

fn diagnostic_key(grade: GradeLevel) -> String {
    format!("{grade}.diagnostic.passed")
}

fn assessment_key(grade: GradeLevel, lesson_id: &str) -> String {
    format!("{grade}.assessment.{lesson_id}.passed")
}

fn stats_key(grade: GradeLevel, lesson_id: &str) -> String {
    format!("{grade}.lesson.{lesson_id}.stats")
}

/// Serializable copy of everything a store holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub flags: BTreeMap<String, bool>,
    pub stats: BTreeMap<String, LessonStats>,
}

#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    flags: RwLock<HashMap<String, bool>>,
    stats: RwLock<HashMap<String, LessonStats>>,
    writes: AtomicU64,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ProgressSnapshot) -> Self {
        Self {
            flags: RwLock::new(snapshot.flags.into_iter().collect()),
            stats: RwLock::new(snapshot.stats.into_iter().collect()),
            writes: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            flags: self
                .flags
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            stats: self
                .stats
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }

    /// Number of writes performed since construction.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn flag(&self, key: &str) -> bool {
        self.flags.read().get(key).copied().unwrap_or(false)
    }

    fn set_flag(&self, key: String, value: bool) {
        self.flags.write().insert(key, value);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

impl ProgressStore for InMemoryProgressStore {
    fn completion_flag(&self, grade: GradeLevel, lesson_id: &str) -> bool {
        self.flag(&completion_key(grade, lesson_id))
    }

    fn set_completion_flag(&self, grade: GradeLevel, lesson_id: &str, completed: bool) {
        self.set_flag(completion_key(grade, lesson_id), completed);
    }

    fn badge_earned(&self, grade: GradeLevel, badge_id: &str) -> bool {
        self.flag(&badge_key(grade, badge_id))
    }

    fn set_badge_earned(&self, grade: GradeLevel, badge_id: &str, earned: bool) {
        self.set_flag(badge_key(grade, badge_id), earned);
    }

    fn diagnostic_passed(&self, grade: GradeLevel) -> bool {
        self.flag(&diagnostic_key(grade))
    }

    fn set_diagnostic_passed(&self, grade: GradeLevel, passed: bool) {
        self.set_flag(diagnostic_key(grade), passed);
    }

    fn assessment_passed(&self, grade: GradeLevel, lesson_id: &str) -> bool {
        self.flag(&assessment_key(grade, lesson_id))
    }

    fn set_assessment_passed(&self, grade: GradeLevel, lesson_id: &str, passed: bool) {
        self.set_flag(assessment_key(grade, lesson_id), passed);
    }

    fn lesson_stats(&self, grade: GradeLevel, lesson_id: &str) -> Option<LessonStats> {
        self.stats.read().get(&stats_key(grade, lesson_id)).copied()
    }

    fn set_lesson_stats(&self, grade: GradeLevel, lesson_id: &str, stats: LessonStats) {
        self.stats.write().insert(stats_key(grade, lesson_id), stats);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_read_as_unset() {
        let store = InMemoryProgressStore::new();
        assert!(!store.completion_flag(GradeLevel::Grade1, "g1-add-1"));
        assert!(!store.diagnostic_passed(GradeLevel::Grade1));
        assert_eq!(store.lesson_stats(GradeLevel::Grade1, "g1-add-1"), None);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn snapshot_restores_flags_and_stats() {
        let store = InMemoryProgressStore::new();
        store.set_completion_flag(GradeLevel::Kindergarten, "k-1", true);
        store.set_badge_earned(GradeLevel::Kindergarten, "counter", true);
        store.set_lesson_stats(
            GradeLevel::Kindergarten,
            "k-1",
            LessonStats::default().accumulate(3, 4),
        );

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let restored = InMemoryProgressStore::from_snapshot(serde_json::from_str(&json).unwrap());

        assert!(restored.completion_flag(GradeLevel::Kindergarten, "k-1"));
        assert!(restored.badge_earned(GradeLevel::Kindergarten, "counter"));
        assert!(!restored.badge_earned(GradeLevel::Grade1, "counter"));
        assert_eq!(
            restored.lesson_stats(GradeLevel::Kindergarten, "k-1"),
            Some(LessonStats {
                correct_answers: 3,
                total_questions: 4,
                attempts: 1
            })
        );
    }
}
