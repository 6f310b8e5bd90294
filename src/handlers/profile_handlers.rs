// src/handlers/profile_handlers.rs
use actix_web::{get, put, web, HttpResponse};
use log::info;

use crate::AppState;
use crate::dtos::api_response::{no_data, ok};
use crate::error::AppError;
use crate::middleware::SignedIn;
use crate::models::ProfilePatch;
use crate::services::auth_services::AuthEvent;

/// GET /api/profile
/// The signed-in user's profile as currently synchronized.
#[get("/profile")]
pub async fn get_profile(user: SignedIn) -> HttpResponse {
    match user.profile {
        Some(profile) => ok("Profile retrieved successfully", profile),
        None => no_data("No profile found"),
    }
}

/// PUT /api/profile
#[put("/profile")]
pub async fn update_profile(
    _user: SignedIn,
    state: web::Data<AppState>,
    body: web::Json<ProfilePatch>,
) -> Result<HttpResponse, AppError> {
    let profile = state.catalog.update_own_profile(body.into_inner()).await?;
    info!("profile {} updated", profile.id);

    // pull the new row into the shared auth state
    if let Some(session) = state.sync.snapshot().session().cloned() {
        state.sync.on_auth_event(AuthEvent::UserUpdated, Some(session)).await;
    }

    Ok(ok("Profile updated", profile))
}
