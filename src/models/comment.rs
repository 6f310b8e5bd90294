use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::profile::Role;

/// Comment row joined with the author's public profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    // joined from profiles
    pub user: Option<CommentAuthor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub role: Option<Role>,
}

pub const MAX_COMMENT_LEN: usize = 2000;

pub fn validate_comment(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Comment cannot be empty".to_string());
    }
    if content.len() > MAX_COMMENT_LEN {
        return Err(format!("Comment must be less than {} characters", MAX_COMMENT_LEN));
    }
    Ok(())
}
