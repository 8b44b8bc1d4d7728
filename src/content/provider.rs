use super::catalog::Catalog;
use super::types::{GradeLevel, Lesson, Playlist};

/// Read access to curriculum content supplied by the host app.
pub trait ContentProvider: Send + Sync {
    fn lessons_for_grade(&self, grade: GradeLevel) -> Vec<Lesson>;

    /// Used when a Grade 1 lesson points back at prerequisite content.
    fn kindergarten_lessons(&self) -> Vec<Lesson> {
        self.lessons_for_grade(GradeLevel::Kindergarten)
    }

    fn playlists_for_grade(&self, _grade: GradeLevel) -> Vec<Playlist> {
        Vec::new()
    }

    fn lesson(&self, lesson_id: &str) -> Option<Lesson> {
        GradeLevel::ALL
            .into_iter()
            .flat_map(|grade| self.lessons_for_grade(grade))
            .find(|lesson| lesson.id == lesson_id)
    }

    fn playlist(&self, playlist_id: &str) -> Option<Playlist> {
        GradeLevel::ALL
            .into_iter()
            .flat_map(|grade| self.playlists_for_grade(grade))
            .find(|playlist| playlist.id == playlist_id)
    }
}

/// Content held in memory, typically decoded from the bundled catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContent {
    lessons: Vec<Lesson>,
    playlists: Vec<Playlist>,
}

impl InMemoryContent {
    pub fn new(lessons: Vec<Lesson>, playlists: Vec<Playlist>) -> Self {
        Self { lessons, playlists }
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        Self::new(catalog.lessons, catalog.playlists)
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

impl ContentProvider for InMemoryContent {
    fn lessons_for_grade(&self, grade: GradeLevel) -> Vec<Lesson> {
        self.lessons
            .iter()
            .filter(|lesson| lesson.grade == grade)
            .cloned()
            .collect()
    }

    fn playlists_for_grade(&self, grade: GradeLevel) -> Vec<Playlist> {
        self.playlists
            .iter()
            .filter(|playlist| playlist.grade == grade)
            .cloned()
            .collect()
    }

    fn lesson(&self, lesson_id: &str) -> Option<Lesson> {
        self.lessons.iter().find(|lesson| lesson.id == lesson_id).cloned()
    }

    fn playlist(&self, playlist_id: &str) -> Option<Playlist> {
        self.playlists
            .iter()
            .find(|playlist| playlist.id == playlist_id)
            .cloned()
    }
}
