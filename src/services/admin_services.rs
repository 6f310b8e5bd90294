// src/services/admin_services.rs - role-gated admin console operations
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use log::{error, info, warn};
use mime::Mime;
use uuid::Uuid;

use crate::error::{AppError, AuthError, AuthorizationError, DataError};
use crate::models::{
    Lesson, LessonPatch, NewLesson, NewSubject, Profile, Role, Session, Subject, SubjectPatch,
};
use crate::repositories::{LessonRepository, ProfileSource, StorageRepository, SubjectRepository};
use crate::services::auth_services::AuthApi;
use crate::services::session_sync::SessionSync;

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub path: String,
    pub public_url: String,
}

#[derive(Clone)]
pub struct AdminService {
    auth: Arc<dyn AuthApi>,
    profiles: Arc<dyn ProfileSource>,
    sync: Arc<SessionSync>,
    subjects: SubjectRepository,
    lessons: LessonRepository,
    storage: StorageRepository,
    max_upload_bytes: usize,
}

impl AdminService {
    pub fn new(
        auth: Arc<dyn AuthApi>,
        profiles: Arc<dyn ProfileSource>,
        sync: Arc<SessionSync>,
        subjects: SubjectRepository,
        lessons: LessonRepository,
        storage: StorageRepository,
        max_upload_bytes: usize,
    ) -> Self {
        Self { auth, profiles, sync, subjects, lessons, storage, max_upload_bytes }
    }

    /// Re-reads the caller's role from `profiles` rather than trusting local
    /// state, and refuses anything but admin.
    async fn require_admin(&self) -> Result<Session, AppError> {
        let session = self.auth.get_session().await?.ok_or_else(|| {
            error!("no session found for admin operation");
            AuthError::NotAuthenticated
        })?;

        let caller = self
            .profiles
            .fetch_profile(session.user.id, &session.access_token)
            .await
            .map_err(|e| {
                error!("error fetching caller profile: {}", e);
                AuthorizationError::Unverifiable(e.to_string())
            })?;

        match caller.map(|p| p.role) {
            Some(Role::Admin) => Ok(session),
            other => {
                warn!("non-admin tried an admin operation: {:?}", other);
                Err(AuthorizationError::AdminRequired.into())
            }
        }
    }

    /// Content authoring is open to staff, judged from the synchronized flags.
    async fn require_staff(&self) -> Result<Session, AppError> {
        let snapshot = self.sync.snapshot();
        if snapshot.is_loading() {
            return Err(AppError::Loading);
        }
        if !snapshot.is_authenticated() {
            return Err(AuthError::NotAuthenticated.into());
        }
        if !snapshot.is_staff() {
            return Err(AuthorizationError::StaffRequired.into());
        }
        // fresh token, the snapshot's one may be about to expire
        let session = self.auth.get_session().await?.ok_or(AuthError::NotAuthenticated)?;
        Ok(session)
    }

    pub async fn update_user_role(&self, user_id: Uuid, role: Role) -> Result<Profile, AppError> {
        let session = self.require_admin().await?;
        let updated = self
            .profiles
            .update_role(user_id, role, &session.access_token)
            .await?;
        info!("user {} role set to {} by {}", user_id, role, session.user.id);
        Ok(updated)
    }

    pub async fn list_all_users(&self) -> Result<Vec<Profile>, AppError> {
        let session = self.require_admin().await?;
        Ok(self.profiles.list_profiles(&session.access_token).await?)
    }

    pub async fn create_subject(&self, subject: NewSubject) -> Result<Subject, AppError> {
        let session = self.require_staff().await?;
        subject.validate().map_err(DataError::Invalid)?;
        let created = self
            .subjects
            .insert(&subject, session.user.id, &session.access_token)
            .await?;
        info!("subject {} created", created.id);
        Ok(created)
    }

    pub async fn update_subject(&self, id: Uuid, patch: SubjectPatch) -> Result<Subject, AppError> {
        let session = self.require_staff().await?;
        patch.validate().map_err(DataError::Invalid)?;
        Ok(self.subjects.update(id, &patch, &session.access_token).await?)
    }

    pub async fn delete_subject(&self, id: Uuid) -> Result<(), AppError> {
        let session = self.require_staff().await?;
        self.subjects.delete(id, &session.access_token).await?;
        info!("subject {} deleted", id);
        Ok(())
    }

    pub async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson, AppError> {
        let session = self.require_staff().await?;
        lesson.validate().map_err(DataError::Invalid)?;
        let created = self
            .lessons
            .insert(&lesson, session.user.id, &session.access_token)
            .await?;
        info!("lesson {} created in subject {}", created.id, created.subject_id);
        Ok(created)
    }

    pub async fn update_lesson(&self, id: Uuid, patch: LessonPatch) -> Result<Lesson, AppError> {
        let session = self.require_staff().await?;
        patch.validate().map_err(DataError::Invalid)?;
        Ok(self.lessons.update(id, &patch, &session.access_token).await?)
    }

    pub async fn delete_lesson(&self, id: Uuid) -> Result<(), AppError> {
        let session = self.require_staff().await?;
        self.lessons.delete(id, &session.access_token).await?;
        info!("lesson {} deleted", id);
        Ok(())
    }

    /// Stores a base64 image (optionally a `data:` URL) for lesson content.
    pub async fn upload_lesson_image(
        &self,
        file_name: &str,
        content_type: &str,
        image_data: &str,
    ) -> Result<UploadedImage, AppError> {
        let session = self.require_staff().await?;
        let bytes = decode_image(content_type, image_data, self.max_upload_bytes)?;

        let path = format!("{}-{}", Utc::now().timestamp_millis(), sanitize_file_name(file_name));
        let stored = self
            .storage
            .upload(&path, bytes, content_type, &session.access_token)
            .await?;
        let public_url = self.storage.public_url(&stored);
        info!("uploaded lesson image {} to bucket {}", stored, self.storage.bucket());
        Ok(UploadedImage { path: stored, public_url })
    }

    pub async fn delete_lesson_image(&self, path: &str) -> Result<(), AppError> {
        let session = self.require_staff().await?;
        self.storage.delete(path, &session.access_token).await?;
        Ok(())
    }
}

/// Validates the media type and size cap, and decodes the payload.
pub fn decode_image(content_type: &str, image_data: &str, max_bytes: usize) -> Result<Vec<u8>, DataError> {
    let mime: Mime = content_type
        .parse()
        .map_err(|_| DataError::UnsupportedMediaType(content_type.to_string()))?;
    if mime.type_() != mime::IMAGE {
        return Err(DataError::UnsupportedMediaType(content_type.to_string()));
    }

    // strip `data:image/png;base64,` if present
    let base64_data = match image_data.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => image_data,
    };

    let bytes = general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| DataError::Invalid(format!("invalid base64 image data: {}", e)))?;
    if bytes.is_empty() {
        return Err(DataError::Invalid("image is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(DataError::PayloadTooLarge { size: bytes.len(), max: max_bytes });
    }
    Ok(bytes)
}

/// Keeps the base name and replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "image".to_string() } else { cleaned }
}
