// src/middleware/auth_guard.rs - route guards over the synchronized auth state
use actix_web::error::ErrorInternalServerError;
use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::debug;

use crate::AppState;
use crate::error::{AppError, AuthError, AuthorizationError};
use crate::models::{Profile, User};
use crate::services::session_sync::AuthSnapshot;

/// A signed-in caller whose auth state has settled.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub profile: Option<Profile>,
}

/// Admin or staff.
#[derive(Debug, Clone)]
pub struct Staff(pub SignedIn);

#[derive(Debug, Clone)]
pub struct Admin(pub SignedIn);

#[derive(Clone, Copy)]
enum Level {
    Any,
    Staff,
    Admin,
}

fn check(snapshot: &AuthSnapshot, level: Level) -> Result<SignedIn, AppError> {
    if snapshot.is_loading() {
        return Err(AppError::Loading);
    }
    let user = snapshot.user().cloned().ok_or(AuthError::NotAuthenticated)?;
    match level {
        Level::Staff if !snapshot.is_staff() => {
            return Err(AuthorizationError::StaffRequired.into());
        }
        Level::Admin if !snapshot.is_admin() => {
            return Err(AuthorizationError::AdminRequired.into());
        }
        _ => {}
    }
    Ok(SignedIn { user, profile: snapshot.profile().cloned() })
}

fn guard(req: &HttpRequest, level: Level) -> Result<SignedIn, Error> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ErrorInternalServerError("app state not configured"))?;
    let snapshot = state.sync.snapshot();
    check(&snapshot, level).map_err(|e| {
        debug!("guard refused {} {}: {}", req.method(), req.path(), e);
        e.into()
    })
}

impl FromRequest for SignedIn {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(guard(req, Level::Any))
    }
}

impl FromRequest for Staff {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(guard(req, Level::Staff).map(Staff))
    }
}

impl FromRequest for Admin {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(guard(req, Level::Admin).map(Admin))
    }
}
