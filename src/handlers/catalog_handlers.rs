// src/handlers/catalog_handlers.rs - learner-facing page views
use actix_web::{delete, get, post, web, HttpResponse};
use uuid::Uuid;

use crate::AppState;
use crate::dtos::api_response::{created, no_data, ok};
use crate::dtos::catalog_dtos::{CreateCommentIn, LessonPageOut, SubjectPageOut};
use crate::error::{AppError, DataError};
use crate::middleware::SignedIn;

/// GET /api/subjects
#[get("/subjects")]
pub async fn list_subjects(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let subjects = state.catalog.list_subjects().await?;
    Ok(ok("Subjects retrieved", subjects))
}

/// GET /api/subject/{subject_id}
#[get("/subject/{subject_id}")]
pub async fn subject_page(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let subject_id = path.into_inner();
    let subject = state
        .catalog
        .get_subject(subject_id)
        .await?
        .ok_or(DataError::NotFound)?;

    let (lessons, progress) = futures::try_join!(
        state.catalog.list_lessons(subject_id),
        state.catalog.progress_for_subject(subject_id),
    )?;

    Ok(ok("Subject retrieved", SubjectPageOut { subject, lessons, progress }))
}

/// GET /api/subject/{subject_id}/lesson/{lesson_id}
#[get("/subject/{subject_id}/lesson/{lesson_id}")]
pub async fn lesson_page(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (subject_id, lesson_id) = path.into_inner();
    let lesson = state
        .catalog
        .get_lesson(lesson_id)
        .await?
        .filter(|l| l.subject_id == subject_id)
        .ok_or(DataError::NotFound)?;

    let (comments, progress) = futures::try_join!(
        state.catalog.list_comments(lesson_id),
        state.catalog.progress_for_subject(subject_id),
    )?;
    let completed = progress
        .iter()
        .any(|p| p.lesson_id == lesson_id && p.completed);

    Ok(ok("Lesson retrieved", LessonPageOut { lesson, comments, completed }))
}

/// POST /api/subject/{subject_id}/lesson/{lesson_id}/complete
#[post("/subject/{subject_id}/lesson/{lesson_id}/complete")]
pub async fn complete_lesson(
    _user: SignedIn,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (_, lesson_id) = path.into_inner();
    state.catalog.mark_lesson_completed(lesson_id).await?;
    Ok(no_data("Lesson marked as completed"))
}

/// GET /api/lessons/{lesson_id}/comments
#[get("/lessons/{lesson_id}/comments")]
pub async fn list_comments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let comments = state.catalog.list_comments(path.into_inner()).await?;
    Ok(ok("Comments retrieved", comments))
}

/// POST /api/lessons/{lesson_id}/comments
#[post("/lessons/{lesson_id}/comments")]
pub async fn add_comment(
    _user: SignedIn,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CreateCommentIn>,
) -> Result<HttpResponse, AppError> {
    let comment = state
        .catalog
        .add_comment(path.into_inner(), &body.content)
        .await?;
    Ok(created("Comment posted", comment))
}

/// DELETE /api/comments/{id}
#[delete("/comments/{id}")]
pub async fn delete_comment(
    _user: SignedIn,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.catalog.delete_comment(path.into_inner()).await?;
    Ok(no_data("Comment deleted"))
}
