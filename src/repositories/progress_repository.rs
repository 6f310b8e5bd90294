// src/repositories/progress_repository.rs
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::DataError;
use crate::models::{LessonProgress, UserProgress};
use crate::repositories::rest::{eq, in_list, RestClient};

#[derive(Clone)]
pub struct ProgressRepository {
    rest: RestClient,
}

impl ProgressRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn find(&self, user_id: Uuid, lesson_id: Uuid, token: &str) -> Result<Option<UserProgress>, DataError> {
        let path = format!(
            "user_progress?{}&{}&select=*",
            eq("user_id", user_id),
            eq("lesson_id", lesson_id)
        );
        let rows: Vec<UserProgress> = self.rest.send_json(self.rest.table(Method::GET, &path, Some(token))).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert_completed(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        at: DateTime<Utc>,
        token: &str,
    ) -> Result<(), DataError> {
        let payload = json!({
            "user_id": user_id,
            "lesson_id": lesson_id,
            "completed": true,
            "completed_at": at,
        });
        let req = self
            .rest
            .table(Method::POST, "user_progress", Some(token))
            .header("Prefer", "return=minimal")
            .json(&payload);
        self.rest.send_empty(req).await
    }

    pub async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>, token: &str) -> Result<(), DataError> {
        let path = format!("user_progress?{}", eq("id", id));
        let req = self
            .rest
            .table(Method::PATCH, &path, Some(token))
            .header("Prefer", "return=minimal")
            .json(&json!({ "completed": true, "completed_at": at }));
        self.rest.send_empty(req).await
    }

    /// Progress rows of `user_id` restricted to `lesson_ids`.
    pub async fn list_for_lessons(
        &self,
        user_id: Uuid,
        lesson_ids: &[Uuid],
        token: &str,
    ) -> Result<Vec<LessonProgress>, DataError> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!(
            "user_progress?{}&{}&select=lesson_id,completed",
            eq("user_id", user_id),
            in_list("lesson_id", lesson_ids)
        );
        self.rest.send_json(self.rest.table(Method::GET, &path, Some(token))).await
    }

    /// Server-side aggregate: percentage of a subject's lessons completed by the user.
    pub async fn subject_progress(&self, subject_id: Uuid, user_id: Uuid, token: &str) -> Result<Option<f64>, DataError> {
        let req = self
            .rest
            .rpc("get_subject_progress", Some(token))
            .json(&json!({ "subject_id": subject_id, "current_user_id": user_id }));
        let value: Value = self.rest.send_json(req).await?;
        Ok(value.as_f64())
    }
}
