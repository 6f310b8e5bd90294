use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub title: String,
    /// Markdown or HTML, stored and returned verbatim.
    pub content: String,
    pub lesson_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLesson {
    pub subject_id: Uuid,
    pub title: String,
    pub content: String,
    pub lesson_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_order: Option<i32>,
}

impl NewLesson {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
        if self.lesson_order < 0 {
            return Err("Lesson order must be zero or greater".to_string());
        }
        Ok(())
    }
}

impl LessonPatch {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err("Title cannot be empty".to_string());
        }
        if matches!(self.lesson_order, Some(o) if o < 0) {
            return Err("Lesson order must be zero or greater".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_order_is_rejected() {
        let lesson = NewLesson {
            subject_id: Uuid::new_v4(),
            title: "Fractions".into(),
            content: String::new(),
            lesson_order: -1,
        };
        assert!(lesson.validate().is_err());

        let patch = LessonPatch { lesson_order: Some(-3), ..Default::default() };
        assert!(patch.validate().is_err());
    }
}
