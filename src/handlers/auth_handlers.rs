use std::time::Duration;

use actix_web::{get, post, web, HttpResponse};
use log::{info, warn};
use tokio::time::timeout;
use uuid::Uuid;

use crate::AppState;
use crate::dtos::api_response::{created, ok};
use crate::dtos::auth_dtos::{AuthStateOut, SignInIn, SignUpIn, SignUpOut};
use crate::error::AppError;
use crate::services::session_sync::{AuthSnapshot, SessionSync};

/// How long a sign-in/out view waits for the synchronizer to catch up.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

async fn settle_on(sync: &SessionSync, user_id: Option<Uuid>) -> AuthSnapshot {
    let mut rx = sync.subscribe();
    let waited = timeout(
        SETTLE_TIMEOUT,
        rx.wait_for(|s| !s.is_loading() && s.user().map(|u| u.id) == user_id),
    )
    .await;
    match waited {
        Ok(Ok(snapshot)) => snapshot.clone(),
        _ => {
            warn!("auth state did not settle within {:?}", SETTLE_TIMEOUT);
            sync.snapshot()
        }
    }
}

/// GET /auth/state
#[get("/state")]
pub async fn auth_state(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.sync.snapshot();
    ok("Auth state", AuthStateOut::from(&snapshot))
}

/// POST /auth/signin
#[post("/signin")]
pub async fn sign_in(
    state: web::Data<AppState>,
    body: web::Json<SignInIn>,
) -> Result<HttpResponse, AppError> {
    let session = state.auth.sign_in(&body.email, &body.password).await?;
    let snapshot = settle_on(&state.sync, Some(session.user.id)).await;
    Ok(ok("Signed in", AuthStateOut::from(&snapshot)))
}

/// POST /auth/signup
#[post("/signup")]
pub async fn sign_up(
    state: web::Data<AppState>,
    body: web::Json<SignUpIn>,
) -> Result<HttpResponse, AppError> {
    let outcome = state
        .auth
        .sign_up(&body.email, &body.password, &body.name)
        .await?;
    let confirmation_required = outcome.session.is_none();
    info!("account created for {}", outcome.user.id);

    Ok(created(
        "Account created",
        SignUpOut {
            user_id: outcome.user.id,
            confirmation_required,
            next_step: if confirmation_required { "confirm_email" } else { "subjects" }.to_string(),
        },
    ))
}

/// POST /auth/signout
#[post("/signout")]
pub async fn sign_out(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    state.auth.sign_out().await?;
    let snapshot = settle_on(&state.sync, None).await;
    Ok(ok("Signed out", AuthStateOut::from(&snapshot)))
}
