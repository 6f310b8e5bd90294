// src/services/catalog_services.rs
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, error, info};
use uuid::Uuid;

use crate::error::{AppError, AuthError, DataError};
use crate::models::comment::validate_comment;
use crate::models::progress::merge_progress;
use crate::models::{
    Comment, Lesson, LessonProgress, Profile, ProfilePatch, Session, Subject, SubjectWithProgress,
};
use crate::repositories::{
    CommentRepository, LessonRepository, ProfileSource, ProgressRepository, SubjectRepository,
};
use crate::services::auth_services::AuthApi;

/// Learner-facing reads and writes: subjects, lessons, progress, comments
/// and the caller's own profile.
#[derive(Clone)]
pub struct CatalogService {
    auth: Arc<dyn AuthApi>,
    profiles: Arc<dyn ProfileSource>,
    subjects: SubjectRepository,
    lessons: LessonRepository,
    comments: CommentRepository,
    progress: ProgressRepository,
}

impl CatalogService {
    pub fn new(
        auth: Arc<dyn AuthApi>,
        profiles: Arc<dyn ProfileSource>,
        subjects: SubjectRepository,
        lessons: LessonRepository,
        comments: CommentRepository,
        progress: ProgressRepository,
    ) -> Self {
        Self { auth, profiles, subjects, lessons, comments, progress }
    }

    /// Current session, or `None` when anonymous or the lookup fails.
    async fn session(&self) -> Option<Session> {
        match self.auth.get_session().await {
            Ok(session) => session,
            Err(e) => {
                error!("error getting session, continuing anonymously: {}", e);
                None
            }
        }
    }

    async fn require_session(&self) -> Result<Session, AuthError> {
        self.auth.get_session().await?.ok_or(AuthError::NotAuthenticated)
    }

    async fn enrich(&self, subject: Subject, session: Option<&Session>) -> Result<SubjectWithProgress, DataError> {
        let token = session.map(|s| s.access_token.as_str());
        let lessons_count = self.subjects.count_lessons(subject.id, token).await?;

        let mut progress = None;
        if let Some(session) = session {
            match self
                .progress
                .subject_progress(subject.id, session.user.id, &session.access_token)
                .await
            {
                Ok(value) => progress = value,
                Err(e) => error!("error getting subject progress for {}: {}", subject.id, e),
            }
        }

        Ok(SubjectWithProgress { subject, lessons_count, progress })
    }

    pub async fn list_subjects(&self) -> Result<Vec<SubjectWithProgress>, DataError> {
        debug!("fetching subjects");
        let session = self.session().await;
        let token = session.as_ref().map(|s| s.access_token.as_str());
        let subjects = self.subjects.list(token).await?;

        let enriched = join_all(subjects.into_iter().map(|s| self.enrich(s, session.as_ref()))).await;
        enriched.into_iter().collect()
    }

    pub async fn get_subject(&self, id: Uuid) -> Result<Option<SubjectWithProgress>, DataError> {
        debug!("fetching subject {}", id);
        let session = self.session().await;
        let token = session.as_ref().map(|s| s.access_token.as_str());
        match self.subjects.get(id, token).await? {
            Some(subject) => Ok(Some(self.enrich(subject, session.as_ref()).await?)),
            None => Ok(None),
        }
    }

    pub async fn list_lessons(&self, subject_id: Uuid) -> Result<Vec<Lesson>, DataError> {
        let session = self.session().await;
        self.lessons
            .list_by_subject(subject_id, session.as_ref().map(|s| s.access_token.as_str()))
            .await
    }

    pub async fn get_lesson(&self, id: Uuid) -> Result<Option<Lesson>, DataError> {
        let session = self.session().await;
        self.lessons.get(id, session.as_ref().map(|s| s.access_token.as_str())).await
    }

    pub async fn mark_lesson_completed(&self, lesson_id: Uuid) -> Result<(), AppError> {
        let session = self.require_session().await?;
        let user_id = session.user.id;
        let token = session.access_token.as_str();
        let now = Utc::now();

        match self.progress.find(user_id, lesson_id, token).await? {
            Some(existing) => self.progress.mark_completed(existing.id, now, token).await?,
            None => self.progress.insert_completed(user_id, lesson_id, now, token).await?,
        }
        info!("lesson {} completed by {}", lesson_id, user_id);
        Ok(())
    }

    /// Completion for every lesson of the subject; empty when anonymous.
    pub async fn progress_for_subject(&self, subject_id: Uuid) -> Result<Vec<LessonProgress>, DataError> {
        let Some(session) = self.session().await else {
            return Ok(Vec::new());
        };
        let token = session.access_token.as_str();

        let lesson_ids = self.lessons.list_ids_by_subject(subject_id, Some(token)).await?;
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .progress
            .list_for_lessons(session.user.id, &lesson_ids, token)
            .await?;
        Ok(merge_progress(&lesson_ids, &rows))
    }

    pub async fn list_comments(&self, lesson_id: Uuid) -> Result<Vec<Comment>, DataError> {
        let session = self.session().await;
        self.comments
            .list_by_lesson(lesson_id, session.as_ref().map(|s| s.access_token.as_str()))
            .await
    }

    pub async fn add_comment(&self, lesson_id: Uuid, content: &str) -> Result<Comment, AppError> {
        let session = self.require_session().await?;
        validate_comment(content).map_err(DataError::Invalid)?;
        let comment = self
            .comments
            .insert(lesson_id, session.user.id, content.trim(), &session.access_token)
            .await?;
        Ok(comment)
    }

    /// Row-level policies decide whose comments may go.
    pub async fn delete_comment(&self, id: Uuid) -> Result<(), AppError> {
        let session = self.require_session().await?;
        self.comments.delete(id, &session.access_token).await?;
        Ok(())
    }

    pub async fn update_own_profile(&self, patch: ProfilePatch) -> Result<Profile, AppError> {
        let session = self.require_session().await?;
        patch.validate().map_err(DataError::Invalid)?;
        let profile = self
            .profiles
            .update_profile(session.user.id, &patch, &session.access_token)
            .await?;
        Ok(profile)
    }
}
