use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// Subject enriched for the catalog views.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectWithProgress {
    #[serde(flatten)]
    pub subject: Subject,
    pub lessons_count: u64,
    /// Completion percentage for the signed-in user, if known.
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NewSubject {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("Description cannot be empty".to_string());
        }
        Ok(())
    }
}

impl SubjectPatch {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err("Title cannot be empty".to_string());
        }
        if matches!(&self.description, Some(d) if d.trim().is_empty()) {
            return Err("Description cannot be empty".to_string());
        }
        Ok(())
    }
}
