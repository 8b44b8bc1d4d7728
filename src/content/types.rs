//! Curriculum records
//!
//! Read-only lesson content as authored in the curriculum catalog. The
//! progression core never mutates these values.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ==================== Grades ====================

/// Grade band a lesson belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeLevel {
    Kindergarten,
    Grade1,
}

impl GradeLevel {
    pub const ALL: [GradeLevel; 2] = [GradeLevel::Kindergarten, GradeLevel::Grade1];

    pub const fn as_str(self) -> &'static str {
        match self {
            GradeLevel::Kindergarten => "kindergarten",
            GradeLevel::Grade1 => "grade1",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "k" | "kindergarten" => Some(GradeLevel::Kindergarten),
            "1" | "g1" | "grade1" | "grade-1" => Some(GradeLevel::Grade1),
            _ => None,
        }
    }

    /// The grade whose mastery gates this one.
    pub const fn prerequisite(self) -> Option<GradeLevel> {
        match self {
            GradeLevel::Kindergarten => None,
            GradeLevel::Grade1 => Some(GradeLevel::Kindergarten),
        }
    }
}

impl std::fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Items ====================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionKind {
    #[default]
    MultipleChoice,
    BaseTenBlocks,
    WordProblem,
    Fractions,
    TimeMatching,
    MoneyCounting,
    DataAnalysis,
}

/// One sub-question of a multi-step word problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// A single question presented to the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    /// Ordered sub-steps; when present each step carries its own answer key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
    /// Revealed one at a time, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tactile_guidance: Option<String>,
    #[serde(default)]
    pub kind: InteractionKind,
}

impl Item {
    pub fn has_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Prompt shown at `step_index`, falling back to the item prompt.
    pub fn prompt_at(&self, step_index: usize) -> &str {
        self.step(step_index)
            .map(|step| step.prompt.as_str())
            .unwrap_or(self.prompt.as_str())
    }

    pub fn choices_at(&self, step_index: usize) -> &[String] {
        self.step(step_index)
            .map(|step| step.choices.as_slice())
            .unwrap_or(self.choices.as_slice())
    }

    /// Hints available at `step_index`: the step's own hint first, then the
    /// item-level hints.
    pub fn hint_ladder(&self, step_index: usize) -> Vec<&str> {
        self.step(step_index)
            .and_then(|step| step.hint.as_deref())
            .into_iter()
            .chain(self.hints.iter().map(String::as_str))
            .collect()
    }
}

// ==================== Lesson structure ====================

/// Extra items offered once enough core items were answered correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSet {
    pub id: String,
    pub title: String,
    pub items: Vec<Item>,
    /// Minimum correctly answered core items before the set becomes eligible.
    #[serde(default)]
    pub threshold: usize,
}

/// Points a struggling learner back to prerequisite content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationLink {
    pub prerequisite_lesson_id: String,
    pub message: String,
    /// Items this link covers. Empty means every item.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub item_ids: BTreeSet<String>,
}

impl RemediationLink {
    pub fn applies_to(&self, item_id: &str) -> bool {
        self.item_ids.is_empty() || self.item_ids.contains(item_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UnlockRequirement {
    #[default]
    Always,
    /// Every lesson of the prior grade completed.
    GradeMastery,
    /// Placement check for this grade passed.
    Diagnostic,
    #[serde(rename_all = "camelCase")]
    UnitCompleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lesson_id: Option<String>,
    },
}

impl UnlockRequirement {
    pub fn unit_completed(lesson_id: impl Into<String>) -> Self {
        UnlockRequirement::UnitCompleted {
            lesson_id: Some(lesson_id.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssessmentKind {
    QuickCheck,
    ExitTicket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub kind: AssessmentKind,
    /// Score ratio in [0, 1] required to pass.
    pub mastery_threshold: f64,
    /// Core items the lesson must contain for a pass to count.
    #[serde(default)]
    pub minimum_items: usize,
}

impl Assessment {
    pub fn is_passed(&self, score: f64, core_items: usize) -> bool {
        core_items >= self.minimum_items && score >= self.mastery_threshold
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonVariant {
    Practice,
    Challenge,
    Remediation,
}

impl LessonVariant {
    pub const ALL: [LessonVariant; 3] = [
        LessonVariant::Practice,
        LessonVariant::Challenge,
        LessonVariant::Remediation,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            LessonVariant::Practice => "practice",
            LessonVariant::Challenge => "challenge",
            LessonVariant::Remediation => "remediation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Emerging,
    Developing,
    Secure,
    Extending,
}

/// An authored unit of instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub grade: GradeLevel,
    /// Topic or mode tag, e.g. `counting` or `story-problems`.
    #[serde(default)]
    pub topic: String,
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub challenge_sets: Vec<ChallengeSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation_links: Vec<RemediationLink>,
    #[serde(default)]
    pub unlock: UnlockRequirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_position: Option<u32>,
    #[serde(default, rename = "strandID", skip_serializing_if = "Option::is_none")]
    pub strand_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<LessonVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objectives: Vec<String>,
}

impl Lesson {
    pub fn summary(&self) -> LessonSummary {
        LessonSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            grade: self.grade,
        }
    }

    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.items
            .iter()
            .chain(self.challenge_sets.iter().flat_map(|set| set.items.iter()))
            .find(|item| item.id == item_id)
    }

    /// First remediation link covering `item_id`, in authored order.
    pub fn remediation_for(&self, item_id: &str) -> Option<&RemediationLink> {
        self.remediation_links
            .iter()
            .find(|link| link.applies_to(item_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    pub grade: GradeLevel,
}

/// Ordered group of lessons sharing a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub grade: GradeLevel,
    pub lesson_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_round_trips_through_str() {
        for grade in GradeLevel::ALL {
            assert_eq!(GradeLevel::parse(grade.as_str()), Some(grade));
        }
        assert_eq!(GradeLevel::parse("K"), Some(GradeLevel::Kindergarten));
        assert_eq!(GradeLevel::parse("grade2"), None);
        assert_eq!(GradeLevel::Grade1.prerequisite(), Some(GradeLevel::Kindergarten));
    }

    #[test]
    fn unlock_requirement_uses_kind_tag() {
        let json = r#"{"kind":"unitCompleted","lessonId":"k-count-1"}"#;
        let parsed: UnlockRequirement = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, UnlockRequirement::unit_completed("k-count-1"));

        let missing: UnlockRequirement =
            serde_json::from_str(r#"{"kind":"unitCompleted"}"#).unwrap();
        assert_eq!(missing, UnlockRequirement::UnitCompleted { lesson_id: None });
    }

    #[test]
    fn hint_ladder_puts_step_hint_first() {
        let item = Item {
            id: "wp-1".into(),
            prompt: "Sam has 3 apples".into(),
            choices: vec!["4".into(), "5".into()],
            correct_index: 1,
            steps: vec![Step {
                prompt: "How many to start?".into(),
                choices: vec!["3".into(), "2".into()],
                correct_index: 0,
                hint: Some("Read the first sentence".into()),
            }],
            hints: vec!["Count on".into()],
            voice_prompt: None,
            tactile_guidance: None,
            kind: InteractionKind::WordProblem,
        };

        assert_eq!(item.hint_ladder(0), vec!["Read the first sentence", "Count on"]);
        assert_eq!(item.hint_ladder(5), vec!["Count on"]);
        assert_eq!(item.prompt_at(0), "How many to start?");
        assert_eq!(item.choices_at(3).len(), 2);
    }

    #[test]
    fn remediation_link_filter() {
        let mut link = RemediationLink {
            prerequisite_lesson_id: "k-1".into(),
            message: "Let's review".into(),
            item_ids: BTreeSet::new(),
        };
        assert!(link.applies_to("anything"));
        link.item_ids.insert("q2".into());
        assert!(link.applies_to("q2"));
        assert!(!link.applies_to("q1"));
    }
}
