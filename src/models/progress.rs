use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub lesson_id: Uuid,
    pub completed: bool,
}

/// Completion state for every lesson in `lesson_ids`, in that order.
/// Lessons without a progress row count as not completed.
pub fn merge_progress(lesson_ids: &[Uuid], rows: &[LessonProgress]) -> Vec<LessonProgress> {
    let done: HashMap<Uuid, bool> = rows.iter().map(|r| (r.lesson_id, r.completed)).collect();
    lesson_ids
        .iter()
        .map(|id| LessonProgress {
            lesson_id: *id,
            completed: done.get(id).copied().unwrap_or(false),
        })
        .collect()
}
