mod catalog;
pub mod provider;
mod types;
pub mod validate;

pub use catalog::{Catalog, CatalogError};
pub use provider::{ContentProvider, InMemoryContent};
pub use types::{
    Assessment, AssessmentKind, Badge, ChallengeSet, Difficulty, GradeLevel, InteractionKind,
    Item, Lesson, LessonSummary, LessonVariant, Playlist, RemediationLink, Step,
    UnlockRequirement,
};
pub use validate::{
    lesson_integrity_errors, validate_catalog, validate_lesson, ContentIntegrityError, Severity,
    ValidationIssue, ValidationReport,
};
