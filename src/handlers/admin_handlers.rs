// src/handlers/admin_handlers.rs - admin console views
use actix_web::{delete, get, post, put, web, HttpResponse};
use log::info;
use uuid::Uuid;

use crate::AppState;
use crate::dtos::admin_dtos::{DashboardOut, LessonIn, RoleIn, UploadImageIn, UploadImageOut};
use crate::dtos::api_response::{created, no_data, ok};
use crate::error::AppError;
use crate::middleware::{Admin, Staff};
use crate::models::{LessonPatch, NewLesson, NewSubject, SubjectPatch};

/// GET /admin
#[get("")]
pub async fn dashboard(_admin: Admin, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let (subjects, users) = futures::try_join!(
        async { state.catalog.list_subjects().await.map_err(AppError::from) },
        state.admin.list_all_users(),
    )?;
    Ok(ok(
        "Dashboard",
        DashboardOut { subjects: subjects.len(), users: users.len() },
    ))
}

/// GET /admin/subjects
#[get("/subjects")]
pub async fn list_subjects(_staff: Staff, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let subjects = state.catalog.list_subjects().await?;
    Ok(ok("Subjects retrieved", subjects))
}

/// POST /admin/subjects
#[post("/subjects")]
pub async fn create_subject(
    _staff: Staff,
    state: web::Data<AppState>,
    body: web::Json<NewSubject>,
) -> Result<HttpResponse, AppError> {
    let subject = state.admin.create_subject(body.into_inner()).await?;
    Ok(created("Subject created", subject))
}

/// PUT /admin/subjects/{id}
#[put("/subjects/{id}")]
pub async fn update_subject(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SubjectPatch>,
) -> Result<HttpResponse, AppError> {
    let subject = state
        .admin
        .update_subject(path.into_inner(), body.into_inner())
        .await?;
    Ok(ok("Subject updated", subject))
}

/// DELETE /admin/subjects/{id}
#[delete("/subjects/{id}")]
pub async fn delete_subject(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.admin.delete_subject(path.into_inner()).await?;
    Ok(no_data("Subject deleted"))
}

/// GET /admin/subjects/{id}/lessons
#[get("/subjects/{id}/lessons")]
pub async fn list_lessons(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let lessons = state.catalog.list_lessons(path.into_inner()).await?;
    Ok(ok("Lessons retrieved", lessons))
}

/// POST /admin/subjects/{id}/lessons
#[post("/subjects/{id}/lessons")]
pub async fn create_lesson(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<LessonIn>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let lesson = NewLesson {
        subject_id: path.into_inner(),
        title: body.title,
        content: body.content,
        lesson_order: body.lesson_order,
    };
    let lesson = state.admin.create_lesson(lesson).await?;
    Ok(created("Lesson created", lesson))
}

/// PUT /admin/lessons/{id}
#[put("/lessons/{id}")]
pub async fn update_lesson(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<LessonPatch>,
) -> Result<HttpResponse, AppError> {
    let lesson = state
        .admin
        .update_lesson(path.into_inner(), body.into_inner())
        .await?;
    Ok(ok("Lesson updated", lesson))
}

/// DELETE /admin/lessons/{id}
#[delete("/lessons/{id}")]
pub async fn delete_lesson(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.admin.delete_lesson(path.into_inner()).await?;
    Ok(no_data("Lesson deleted"))
}

/// GET /admin/users
#[get("/users")]
pub async fn list_users(_admin: Admin, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let users = state.admin.list_all_users().await?;
    Ok(ok("Users retrieved", users))
}

/// PUT /admin/users/{id}/role
#[put("/users/{id}/role")]
pub async fn update_user_role(
    admin: Admin,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<RoleIn>,
) -> Result<HttpResponse, AppError> {
    let target = path.into_inner();
    info!("role change for {} requested by {}", target, admin.0.user.id);
    let profile = state.admin.update_user_role(target, body.role).await?;
    Ok(ok("User role updated successfully", profile))
}

/// POST /admin/uploads
/// Body: base64 image with its file name and MIME type.
#[post("/uploads")]
pub async fn upload_image(
    _staff: Staff,
    state: web::Data<AppState>,
    body: web::Json<UploadImageIn>,
) -> Result<HttpResponse, AppError> {
    let uploaded = state
        .admin
        .upload_lesson_image(&body.file_name, &body.content_type, &body.image_data)
        .await?;
    Ok(created(
        "Image uploaded",
        UploadImageOut { path: uploaded.path, public_url: uploaded.public_url },
    ))
}

/// DELETE /admin/uploads/{path}
#[delete("/uploads/{path:.*}")]
pub async fn delete_image(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.admin.delete_lesson_image(&path.into_inner()).await?;
    Ok(no_data("Image deleted"))
}
