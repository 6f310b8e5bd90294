// src/repositories/subject_repository.rs
use reqwest::Method;
use reqwest::header::CONTENT_RANGE;
use serde_json::json;
use uuid::Uuid;

use crate::error::DataError;
use crate::models::{NewSubject, Subject, SubjectPatch};
use crate::repositories::rest::{eq, parse_content_range_total, RestClient};

#[derive(Clone)]
pub struct SubjectRepository {
    rest: RestClient,
}

impl SubjectRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn list(&self, token: Option<&str>) -> Result<Vec<Subject>, DataError> {
        let req = self.rest.table(Method::GET, "subjects?select=*&order=created_at.asc", token);
        self.rest.send_json(req).await
    }

    pub async fn get(&self, id: Uuid, token: Option<&str>) -> Result<Option<Subject>, DataError> {
        let path = format!("subjects?{}&select=*", eq("id", id));
        let rows: Vec<Subject> = self.rest.send_json(self.rest.table(Method::GET, &path, token)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert(
        &self,
        subject: &NewSubject,
        created_by: Uuid,
        token: &str,
    ) -> Result<Subject, DataError> {
        let payload = json!({
            "title": subject.title,
            "description": subject.description,
            "image": subject.image,
            "created_by": created_by,
        });
        let req = self
            .rest
            .table(Method::POST, "subjects", Some(token))
            .header("Prefer", "return=representation")
            .json(&payload);
        self.rest.send_single(req).await
    }

    pub async fn update(&self, id: Uuid, patch: &SubjectPatch, token: &str) -> Result<Subject, DataError> {
        let path = format!("subjects?{}", eq("id", id));
        let req = self
            .rest
            .table(Method::PATCH, &path, Some(token))
            .header("Prefer", "return=representation")
            .json(patch);
        self.rest.send_single(req).await
    }

    pub async fn delete(&self, id: Uuid, token: &str) -> Result<(), DataError> {
        let path = format!("subjects?{}", eq("id", id));
        self.rest.send_empty(self.rest.table(Method::DELETE, &path, Some(token))).await
    }

    /// Exact lesson count for a subject, read from `Content-Range` of a HEAD request.
    pub async fn count_lessons(&self, subject_id: Uuid, token: Option<&str>) -> Result<u64, DataError> {
        let path = format!("lessons?{}&select=id", eq("subject_id", subject_id));
        let req = self
            .rest
            .table(Method::HEAD, &path, token)
            .header("Prefer", "count=exact");
        let resp = self.rest.send(req).await?;
        let total = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .unwrap_or(0);
        Ok(total)
    }
}
