// src/repositories/comment_repository.rs - comments joined with author profile
use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use crate::error::DataError;
use crate::models::Comment;
use crate::repositories::rest::{eq, RestClient};

/// Embeds the author's public profile fields as `user`.
const COMMENT_SELECT: &str = "*,user:profiles(id,name,avatar,role)";

#[derive(Clone)]
pub struct CommentRepository {
    rest: RestClient,
}

impl CommentRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Newest first.
    pub async fn list_by_lesson(&self, lesson_id: Uuid, token: Option<&str>) -> Result<Vec<Comment>, DataError> {
        let path = format!(
            "comments?{}&select={}&order=created_at.desc",
            eq("lesson_id", lesson_id),
            COMMENT_SELECT
        );
        self.rest.send_json(self.rest.table(Method::GET, &path, token)).await
    }

    pub async fn insert(
        &self,
        lesson_id: Uuid,
        user_id: Uuid,
        content: &str,
        token: &str,
    ) -> Result<Comment, DataError> {
        let payload = json!({
            "lesson_id": lesson_id,
            "user_id": user_id,
            "content": content,
        });
        let path = format!("comments?select={}", COMMENT_SELECT);
        let req = self
            .rest
            .table(Method::POST, &path, Some(token))
            .header("Prefer", "return=representation")
            .json(&payload);
        self.rest.send_single(req).await
    }

    pub async fn delete(&self, id: Uuid, token: &str) -> Result<(), DataError> {
        let path = format!("comments?{}", eq("id", id));
        self.rest.send_empty(self.rest.table(Method::DELETE, &path, Some(token))).await
    }
}
