// src/repositories/lesson_repository.rs
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::DataError;
use crate::models::{Lesson, LessonPatch, NewLesson};
use crate::repositories::rest::{eq, RestClient};

#[derive(Clone)]
pub struct LessonRepository {
    rest: RestClient,
}

#[derive(Deserialize)]
struct LessonId {
    id: Uuid,
}

impl LessonRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Lessons of a subject in `lesson_order` ascending.
    pub async fn list_by_subject(&self, subject_id: Uuid, token: Option<&str>) -> Result<Vec<Lesson>, DataError> {
        let path = format!(
            "lessons?{}&select=*&order=lesson_order.asc",
            eq("subject_id", subject_id)
        );
        self.rest.send_json(self.rest.table(Method::GET, &path, token)).await
    }

    pub async fn list_ids_by_subject(&self, subject_id: Uuid, token: Option<&str>) -> Result<Vec<Uuid>, DataError> {
        let path = format!(
            "lessons?{}&select=id&order=lesson_order.asc",
            eq("subject_id", subject_id)
        );
        let rows: Vec<LessonId> = self.rest.send_json(self.rest.table(Method::GET, &path, token)).await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    pub async fn get(&self, id: Uuid, token: Option<&str>) -> Result<Option<Lesson>, DataError> {
        let path = format!("lessons?{}&select=*", eq("id", id));
        let rows: Vec<Lesson> = self.rest.send_json(self.rest.table(Method::GET, &path, token)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert(&self, lesson: &NewLesson, created_by: Uuid, token: &str) -> Result<Lesson, DataError> {
        let payload = json!({
            "subject_id": lesson.subject_id,
            "title": lesson.title,
            "content": lesson.content,
            "lesson_order": lesson.lesson_order,
            "created_by": created_by,
        });
        let req = self
            .rest
            .table(Method::POST, "lessons", Some(token))
            .header("Prefer", "return=representation")
            .json(&payload);
        self.rest.send_single(req).await
    }

    pub async fn update(&self, id: Uuid, patch: &LessonPatch, token: &str) -> Result<Lesson, DataError> {
        let path = format!("lessons?{}", eq("id", id));
        let req = self
            .rest
            .table(Method::PATCH, &path, Some(token))
            .header("Prefer", "return=representation")
            .json(patch);
        self.rest.send_single(req).await
    }

    pub async fn delete(&self, id: Uuid, token: &str) -> Result<(), DataError> {
        let path = format!("lessons?{}", eq("id", id));
        self.rest.send_empty(self.rest.table(Method::DELETE, &path, Some(token))).await
    }
}
