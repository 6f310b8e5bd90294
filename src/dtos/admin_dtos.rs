use serde::{Deserialize, Serialize};

use crate::models::Role;

#[derive(Debug, Deserialize)]
pub struct LessonIn {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub lesson_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct RoleIn {
    pub role: Role,
}

#[derive(Deserialize)]
pub struct UploadImageIn {
    pub image_data: String, // base64, data URL prefix allowed
    pub file_name: String,
    pub content_type: String, // "image/png", "image/jpeg", ...
}

#[derive(Serialize)]
pub struct UploadImageOut {
    pub path: String,
    pub public_url: String,
}

#[derive(Serialize)]
pub struct DashboardOut {
    pub subjects: usize,
    pub users: usize,
}
