use serde::{Deserialize, Serialize};

use crate::models::{Comment, Lesson, LessonProgress, SubjectWithProgress};

#[derive(Serialize)]
pub struct SubjectPageOut {
    pub subject: SubjectWithProgress,
    pub lessons: Vec<Lesson>,
    pub progress: Vec<LessonProgress>,
}

#[derive(Serialize)]
pub struct LessonPageOut {
    pub lesson: Lesson,
    pub comments: Vec<Comment>,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentIn {
    pub content: String,
}
