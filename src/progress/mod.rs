mod aggregator;
mod store;

pub use aggregator::{CompletionContext, GradeProgress, PlaylistProgress, ProgressAggregator};
pub use store::{InMemoryProgressStore, LessonStats, ProgressSnapshot, ProgressStore};
