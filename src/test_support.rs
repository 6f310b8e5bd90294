//! In-memory stand-ins for the Supabase auth and profiles endpoints.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::{AuthError, DataError, ProfileFetchError};
use crate::models::{Profile, ProfilePatch, Role, Session, User, UserMetadata};
use crate::repositories::ProfileSource;
use crate::services::auth_services::{AuthApi, AuthChange, AuthEvent, SignUpOutcome};
use crate::services::session_sync::SessionSync;

pub fn user_named(name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: Some(format!("{}@example.com", name)),
        user_metadata: UserMetadata { name: Some(name.to_string()) },
    }
}

pub fn session_for(user: &User) -> Session {
    Session {
        access_token: format!("token-{}", user.id),
        refresh_token: Some(format!("refresh-{}", user.id)),
        token_type: Some("bearer".into()),
        expires_in: Some(3600),
        expires_at: Some((Utc::now() + Duration::hours(1)).timestamp()),
        user: user.clone(),
    }
}

pub fn profile_for(user: &User, role: Role) -> Profile {
    Profile {
        id: user.id,
        name: user.user_metadata.name.clone(),
        email: user.email.clone(),
        avatar: None,
        role,
        created_at: Utc.timestamp_opt(1_700_000_000, 0).single(),
    }
}

pub struct FakeAuth {
    session: Mutex<Option<Session>>,
    fail_get: AtomicBool,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    events: broadcast::Sender<AuthChange>,
}

impl FakeAuth {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(None),
            fail_get: AtomicBool::new(false),
            gate: Mutex::new(None),
            events,
        }
    }

    pub fn with_session(session: Session) -> Self {
        let auth = Self::new();
        auth.set_session(Some(session));
        auth
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    pub fn fail_next_get(&self) {
        self.fail_get.store(true, Ordering::SeqCst);
    }

    /// Holds the next `get_session` call until the returned sender fires.
    pub fn gate_get_session(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let _ = self.events.send(AuthChange { event, session });
    }
}

#[async_trait]
impl AuthApi for FakeAuth {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_get.swap(false, Ordering::SeqCst) {
            return Err(AuthError::Supabase("session endpoint unavailable".into()));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if password == "wrong-password" {
            return Err(AuthError::InvalidCredentials);
        }
        let name = email.split('@').next().unwrap_or(email);
        let session = session_for(&user_named(name));
        self.set_session(Some(session.clone()));
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, _email: &str, _password: &str, display_name: &str) -> Result<SignUpOutcome, AuthError> {
        Ok(SignUpOutcome { user: user_named(display_name), session: None })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.set_session(None);
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

pub struct FakeProfiles {
    rows: Mutex<HashMap<Uuid, Profile>>,
    failing: Mutex<HashSet<Uuid>>,
    gates: Mutex<HashMap<Uuid, oneshot::Receiver<()>>>,
    fetches: AtomicUsize,
    writes: AtomicUsize,
}

impl FakeProfiles {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, profile: Profile) {
        self.rows.lock().unwrap().insert(profile.id, profile);
    }

    pub fn get(&self, id: Uuid) -> Option<Profile> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn fail_for(&self, id: Uuid) {
        self.failing.lock().unwrap().insert(id);
    }

    /// Holds the next fetch for `id` until the returned sender fires.
    pub fn gate(&self, id: Uuid) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(id, rx);
        tx
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn fetch_profile(&self, user_id: Uuid, _access_token: &str) -> Result<Option<Profile>, ProfileFetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().remove(&user_id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.failing.lock().unwrap().contains(&user_id) {
            return Err(ProfileFetchError::Supabase("503 -> upstream unavailable".into()));
        }
        Ok(self.get(user_id))
    }

    async fn update_profile(&self, user_id: Uuid, patch: &ProfilePatch, _access_token: &str) -> Result<Profile, DataError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&user_id).ok_or(DataError::NotFound)?;
        if let Some(name) = &patch.name {
            row.name = Some(name.clone());
        }
        if let Some(avatar) = &patch.avatar {
            row.avatar = Some(avatar.clone());
        }
        Ok(row.clone())
    }

    async fn update_role(&self, user_id: Uuid, role: Role, _access_token: &str) -> Result<Profile, DataError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&user_id).ok_or(DataError::NotFound)?;
        row.role = role;
        Ok(row.clone())
    }

    async fn list_profiles(&self, _access_token: &str) -> Result<Vec<Profile>, DataError> {
        let mut all: Vec<Profile> = self.rows.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

/// App state over the fakes. REST-backed repositories point at an unroutable
/// address, so only views served by auth and profiles can succeed.
pub fn app_state(auth: Arc<FakeAuth>, profiles: Arc<FakeProfiles>) -> AppState {
    let config = AppConfig::new("http://127.0.0.1:9", "anon");
    let sync = Arc::new(SessionSync::new(auth.clone(), profiles.clone()));
    AppState::new(config, reqwest::Client::new(), auth, profiles, sync)
}
