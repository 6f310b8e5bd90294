use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Profile;
use crate::services::session_sync::{AuthSnapshot, Phase};

#[derive(Deserialize)]
pub struct SignInIn {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpIn {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct SignUpOut {
    pub user_id: Uuid,
    pub confirmation_required: bool,
    pub next_step: String,
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// What the UI needs to render auth-dependent chrome.
#[derive(Debug, Serialize)]
pub struct AuthStateOut {
    pub phase: Phase,
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub is_admin: bool,
    pub is_staff: bool,
    pub user: Option<UserOut>,
    pub profile: Option<Profile>,
    pub error: Option<String>,
}

impl From<&AuthSnapshot> for AuthStateOut {
    fn from(s: &AuthSnapshot) -> Self {
        Self {
            phase: s.phase,
            is_loading: s.is_loading(),
            is_authenticated: s.is_authenticated(),
            is_admin: s.is_admin(),
            is_staff: s.is_staff(),
            user: s.user().map(|u| UserOut {
                id: u.id,
                email: u.email.clone(),
                name: u.user_metadata.name.clone(),
            }),
            profile: s.profile().cloned(),
            error: s.error.clone(),
        }
    }
}
