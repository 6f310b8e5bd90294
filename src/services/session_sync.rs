//! Process-wide authentication state.
//!
//! [`SessionSync`] mirrors the backend's session and the matching `profiles`
//! row into one immutable [`AuthSnapshot`], replaced as a whole on every
//! transition and handed out through a `tokio::sync::watch` channel.
//!
//! Two sources feed it: the one-shot [`SessionSync::initialize`] check at
//! startup and the push feed of [`AuthChange`] events. Both can be in
//! flight at once. Every session observation (an event arriving, or the
//! initial session read completing) takes a stamp from a monotonic counter,
//! and a profile fetch only lands if its stamp is still the newest one. The
//! observation that completes last therefore wins, and a slow profile fetch
//! can never overwrite what a newer event already published.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::ProfileFetchError;
use crate::models::{Profile, Session, User};
use crate::repositories::ProfileSource;
use crate::services::auth_services::{AuthApi, AuthChange, AuthEvent};

/// How long a profile lookup may hold the auth state in loading.
pub const DEFAULT_PROFILE_TIMEOUT: Duration = Duration::from_secs(10);

/// Who is signed in, as far as the process knows.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Anonymous,
    AuthenticatedNoProfile { user: User, session: Session },
    AuthenticatedWithProfile { user: User, session: Session, profile: Profile },
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::AuthenticatedNoProfile { user, .. }
            | Identity::AuthenticatedWithProfile { user, .. } => Some(user),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Identity::Anonymous => None,
            Identity::AuthenticatedNoProfile { session, .. }
            | Identity::AuthenticatedWithProfile { session, .. } => Some(session),
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Identity::AuthenticatedWithProfile { profile, .. } => Some(profile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Loading,
    Resolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub identity: Identity,
    pub phase: Phase,
    /// Last absorbed session or profile error, for display only.
    pub error: Option<String>,
    /// Stamp of the observation that produced this identity.
    pub seq: u64,
}

impl AuthSnapshot {
    fn uninitialized() -> Self {
        Self {
            identity: Identity::Anonymous,
            phase: Phase::Uninitialized,
            error: None,
            seq: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase != Phase::Resolved
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.user().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.identity.profile().is_some_and(|p| p.role.is_admin())
    }

    pub fn is_staff(&self) -> bool {
        self.identity.profile().is_some_and(|p| p.role.is_staff())
    }

    pub fn user(&self) -> Option<&User> {
        self.identity.user()
    }

    pub fn session(&self) -> Option<&Session> {
        self.identity.session()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.identity.profile()
    }
}

pub struct SessionSync {
    auth: Arc<dyn AuthApi>,
    profiles: Arc<dyn ProfileSource>,
    state: watch::Sender<AuthSnapshot>,
    observed: AtomicU64,
    profile_timeout: Duration,
}

impl SessionSync {
    pub fn new(auth: Arc<dyn AuthApi>, profiles: Arc<dyn ProfileSource>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::uninitialized());
        Self {
            auth,
            profiles,
            state,
            observed: AtomicU64::new(0),
            profile_timeout: DEFAULT_PROFILE_TIMEOUT,
        }
    }

    pub fn with_profile_timeout(mut self, limit: Duration) -> Self {
        self.profile_timeout = limit;
        self
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// Waits for the first snapshot that is not loading.
    pub async fn settled(&self) -> AuthSnapshot {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|s| !s.is_loading()).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    /// Startup check for an existing session.
    pub async fn initialize(&self) {
        self.commit(|current| {
            (current.phase == Phase::Uninitialized).then(|| AuthSnapshot {
                phase: Phase::Loading,
                ..current.clone()
            })
        });
        self.check_session().await;
    }

    /// Starts consuming the backend's auth feed, in arrival order.
    pub fn attach(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.auth.subscribe();
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthChange { event, session }) => sync.on_auth_event(event, session).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("auth feed lagged by {} events, re-reading session", skipped);
                        sync.check_session().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("auth feed closed");
                        break;
                    }
                }
            }
        })
    }

    pub async fn on_auth_event(&self, event: AuthEvent, session: Option<Session>) {
        debug!("auth state changed: {} (session: {})", event, session.is_some());
        match (event, session) {
            (AuthEvent::SignedOut, _) | (_, None) => {
                let stamp = self.next_stamp();
                self.publish(stamp, Identity::Anonymous, Phase::Resolved, None);
            }
            (AuthEvent::TokenRefreshed, Some(session)) => {
                if !self.refresh_in_place(&session) {
                    let stamp = self.next_stamp();
                    self.resolve_session(stamp, session).await;
                }
            }
            (_, Some(session)) => {
                let stamp = self.next_stamp();
                self.resolve_session(stamp, session).await;
            }
        }
    }

    async fn check_session(&self) {
        let result = self.auth.get_session().await;
        // stamped on completion, not on issue
        let stamp = self.next_stamp();
        match result {
            Ok(Some(session)) => self.resolve_session(stamp, session).await,
            Ok(None) => {
                debug!("no existing session");
                self.publish(stamp, Identity::Anonymous, Phase::Resolved, None);
            }
            Err(e) => {
                error!("error getting session: {}", e);
                self.publish(stamp, Identity::Anonymous, Phase::Resolved, Some(e.to_string()));
            }
        }
    }

    async fn resolve_session(&self, stamp: u64, session: Session) {
        let user_id = session.user.id;
        let access_token = session.access_token.clone();
        let loading = Identity::AuthenticatedNoProfile {
            user: session.user.clone(),
            session,
        };
        if !self.publish(stamp, loading, Phase::Loading, None) {
            debug!("dropping stale session observation #{}", stamp);
            return;
        }

        let fetched = timeout(self.profile_timeout, self.profiles.fetch_profile(user_id, &access_token))
            .await
            .unwrap_or_else(|_| Err(ProfileFetchError::Timeout(self.profile_timeout)));
        let (profile, error) = match fetched {
            Ok(Some(profile)) => (Some(profile), None),
            Ok(None) => {
                warn!("user profile not found for authenticated user {}", user_id);
                (None, None)
            }
            Err(e) => {
                error!("error fetching user profile for {}: {}", user_id, e);
                (None, Some(e.to_string()))
            }
        };

        let landed = self.commit(|current| {
            if current.seq != stamp {
                return None;
            }
            // the session may have been refreshed while the fetch was running
            let Identity::AuthenticatedNoProfile { user, session } = &current.identity else {
                return None;
            };
            let (user, session) = (user.clone(), session.clone());
            let identity = match profile {
                Some(profile) => Identity::AuthenticatedWithProfile { user, session, profile },
                None => Identity::AuthenticatedNoProfile { user, session },
            };
            Some(AuthSnapshot {
                identity,
                phase: Phase::Resolved,
                error,
                seq: stamp,
            })
        });

        if landed {
            info!("auth state resolved for user {}", user_id);
        } else {
            debug!("discarding profile for user {}: superseded by a newer event", user_id);
        }
    }

    /// Swaps in a renewed session for the active user. Never touches `phase`.
    fn refresh_in_place(&self, renewed: &Session) -> bool {
        self.commit(|current| {
            let identity = match &current.identity {
                Identity::AuthenticatedNoProfile { user, .. } if user.id == renewed.user.id => {
                    Identity::AuthenticatedNoProfile {
                        user: renewed.user.clone(),
                        session: renewed.clone(),
                    }
                }
                Identity::AuthenticatedWithProfile { user, profile, .. }
                    if user.id == renewed.user.id =>
                {
                    Identity::AuthenticatedWithProfile {
                        user: renewed.user.clone(),
                        session: renewed.clone(),
                        profile: profile.clone(),
                    }
                }
                _ => return None,
            };
            Some(AuthSnapshot {
                identity,
                phase: current.phase,
                error: current.error.clone(),
                seq: current.seq,
            })
        })
    }

    fn next_stamp(&self) -> u64 {
        self.observed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publishes a new identity unless a newer observation already landed.
    fn publish(&self, stamp: u64, identity: Identity, phase: Phase, error: Option<String>) -> bool {
        self.commit(|current| {
            if stamp <= current.seq {
                return None;
            }
            Some(AuthSnapshot { identity, phase, error, seq: stamp })
        })
    }

    /// Check-and-replace under the channel's write lock.
    fn commit(&self, next: impl FnOnce(&AuthSnapshot) -> Option<AuthSnapshot>) -> bool {
        self.state.send_if_modified(|current| match next(current) {
            Some(snapshot) => {
                *current = snapshot;
                true
            }
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::models::Role;
    use crate::test_support::{profile_for, session_for, user_named, FakeAuth, FakeProfiles};

    fn sync_with(auth: &Arc<FakeAuth>, profiles: &Arc<FakeProfiles>) -> Arc<SessionSync> {
        Arc::new(SessionSync::new(auth.clone(), profiles.clone()))
    }

    fn assert_consistent(s: &AuthSnapshot) {
        assert!(!s.is_admin() || s.is_staff(), "admin without staff: {:?}", s);
        assert!(!s.is_staff() || s.is_authenticated(), "staff without user: {:?}", s);
        if let (Some(user), Some(profile)) = (s.user(), s.profile()) {
            assert_eq!(user.id, profile.id, "profile of another user: {:?}", s);
        }
        if let (Some(user), Some(session)) = (s.user(), s.session()) {
            assert_eq!(user.id, session.user.id);
        }
        if !s.is_loading() {
            assert_eq!(s.is_authenticated(), s.user().is_some());
            assert_eq!(s.is_admin(), s.profile().map(|p| p.role) == Some(Role::Admin));
        }
    }

    /// Records every snapshot the watch channel hands out.
    fn watch_all(sync: &Arc<SessionSync>) -> (JoinHandle<()>, Arc<Mutex<Vec<AuthSnapshot>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut rx = sync.subscribe();
        let sink = seen.clone();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snap = rx.borrow_and_update().clone();
                sink.lock().unwrap().push(snap);
            }
        });
        (handle, seen)
    }

    #[tokio::test]
    async fn starts_uninitialized_and_loading() {
        let sync = sync_with(&Arc::new(FakeAuth::new()), &Arc::new(FakeProfiles::new()));
        let snap = sync.snapshot();
        assert_eq!(snap.phase, Phase::Uninitialized);
        assert!(snap.is_loading());
        assert!(!snap.is_authenticated());
    }

    #[tokio::test]
    async fn no_existing_session_resolves_anonymous() {
        let sync = sync_with(&Arc::new(FakeAuth::new()), &Arc::new(FakeProfiles::new()));
        sync.initialize().await;

        let snap = sync.snapshot();
        assert_eq!(snap.identity, Identity::Anonymous);
        assert!(!snap.is_loading());
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn existing_session_loads_profile() {
        let ana = user_named("ana");
        let auth = Arc::new(FakeAuth::with_session(session_for(&ana)));
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        let sync = sync_with(&auth, &profiles);

        sync.initialize().await;

        let snap = sync.snapshot();
        assert!(!snap.is_loading());
        assert!(snap.is_authenticated());
        assert!(snap.is_admin());
        assert!(snap.is_staff());
        assert_eq!(snap.user().map(|u| u.id), Some(ana.id));
        assert_consistent(&snap);
    }

    #[tokio::test]
    async fn staff_role_is_staff_but_not_admin() {
        let sam = user_named("sam");
        let auth = Arc::new(FakeAuth::new());
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&sam, Role::Staff));
        let sync = sync_with(&auth, &profiles);

        sync.on_auth_event(AuthEvent::SignedIn, Some(session_for(&sam))).await;

        let snap = sync.snapshot();
        assert!(snap.is_authenticated());
        assert!(!snap.is_admin());
        assert!(snap.is_staff());
    }

    #[tokio::test]
    async fn failed_profile_fetch_resolves_without_profile() {
        let ana = user_named("ana");
        let auth = Arc::new(FakeAuth::new());
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        profiles.fail_for(ana.id);
        let sync = sync_with(&auth, &profiles);

        sync.on_auth_event(AuthEvent::SignedIn, Some(session_for(&ana))).await;

        let snap = sync.snapshot();
        assert!(!snap.is_loading());
        assert!(snap.profile().is_none());
        assert!(snap.is_authenticated());
        assert!(!snap.is_admin());
        assert!(!snap.is_staff());
        assert!(snap.error.is_some());
    }

    #[tokio::test]
    async fn stalled_profile_fetch_still_resolves() {
        let ana = user_named("ana");
        let auth = Arc::new(FakeAuth::new());
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        // held for the whole test: the fetch never returns on its own
        let _stall = profiles.gate(ana.id);
        let sync = Arc::new(
            SessionSync::new(auth.clone(), profiles.clone())
                .with_profile_timeout(Duration::from_millis(50)),
        );

        sync.on_auth_event(AuthEvent::SignedIn, Some(session_for(&ana))).await;

        let snap = sync.snapshot();
        assert!(!snap.is_loading());
        assert!(snap.is_authenticated());
        assert!(snap.profile().is_none());
        assert!(!snap.is_admin());
        assert!(snap.error.as_deref().is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn events_behind_a_stalled_fetch_are_still_applied() {
        let ana = user_named("ana");
        let auth = Arc::new(FakeAuth::new());
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::User));
        let _stall = profiles.gate(ana.id);
        let sync = Arc::new(
            SessionSync::new(auth.clone(), profiles.clone())
                .with_profile_timeout(Duration::from_millis(50)),
        );
        let feed = sync.attach();

        auth.emit(AuthEvent::SignedIn, Some(session_for(&ana)));
        auth.emit(AuthEvent::SignedOut, None);

        let mut rx = sync.subscribe();
        let settled = tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| !s.is_loading() && s.seq >= 2),
        )
        .await
        .expect("feed stalled behind the profile fetch")
        .map(|s| s.clone())
        .unwrap();

        assert!(!settled.is_authenticated());
        assert!(settled.profile().is_none());
        feed.abort();
    }

    #[tokio::test]
    async fn missing_profile_row_is_not_an_error() {
        let ana = user_named("ana");
        let sync = sync_with(&Arc::new(FakeAuth::new()), &Arc::new(FakeProfiles::new()));

        sync.on_auth_event(AuthEvent::SignedIn, Some(session_for(&ana))).await;

        let snap = sync.snapshot();
        assert!(matches!(snap.identity, Identity::AuthenticatedNoProfile { .. }));
        assert!(snap.error.is_none());
        assert!(!snap.is_loading());
    }

    #[tokio::test]
    async fn session_lookup_error_resolves_anonymous() {
        let auth = Arc::new(FakeAuth::new());
        auth.fail_next_get();
        let sync = sync_with(&auth, &Arc::new(FakeProfiles::new()));

        sync.initialize().await;

        let snap = sync.snapshot();
        assert_eq!(snap.identity, Identity::Anonymous);
        assert!(!snap.is_loading());
        assert!(snap.error.is_some());
    }

    #[tokio::test]
    async fn sign_out_clears_user_and_profile() {
        let ana = user_named("ana");
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        let sync = sync_with(&Arc::new(FakeAuth::new()), &profiles);

        sync.on_auth_event(AuthEvent::SignedIn, Some(session_for(&ana))).await;
        assert!(sync.snapshot().is_admin());

        sync.on_auth_event(AuthEvent::SignedOut, None).await;

        let snap = sync.snapshot();
        assert!(snap.user().is_none());
        assert!(snap.profile().is_none());
        assert!(!snap.is_admin());
        assert!(!snap.is_loading());

        // also from an already anonymous state
        sync.on_auth_event(AuthEvent::SignedOut, None).await;
        assert!(sync.snapshot().user().is_none());
    }

    #[tokio::test]
    async fn token_refresh_is_silent() {
        let ana = user_named("ana");
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::User));
        let sync = sync_with(&Arc::new(FakeAuth::new()), &profiles);
        sync.on_auth_event(AuthEvent::SignedIn, Some(session_for(&ana))).await;
        let fetches_before = profiles.fetch_count();

        let (watcher, seen) = watch_all(&sync);
        tokio::task::yield_now().await;

        let mut renewed = session_for(&ana);
        renewed.access_token = "renewed-token".into();
        sync.on_auth_event(AuthEvent::TokenRefreshed, Some(renewed)).await;
        tokio::task::yield_now().await;
        watcher.abort();

        let snap = sync.snapshot();
        assert!(!snap.is_loading());
        assert_eq!(snap.session().map(|s| s.access_token.as_str()), Some("renewed-token"));
        assert!(snap.profile().is_some());
        assert_eq!(profiles.fetch_count(), fetches_before);
        assert!(seen.lock().unwrap().iter().all(|s| !s.is_loading()));
    }

    #[tokio::test]
    async fn refresh_for_unknown_user_is_a_sign_in() {
        let ana = user_named("ana");
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Staff));
        let sync = sync_with(&Arc::new(FakeAuth::new()), &profiles);

        sync.on_auth_event(AuthEvent::TokenRefreshed, Some(session_for(&ana))).await;

        let snap = sync.snapshot();
        assert!(snap.is_staff());
        assert!(!snap.is_loading());
    }

    #[tokio::test]
    async fn refresh_during_profile_fetch_keeps_renewed_session() {
        let ana = user_named("ana");
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        let release = profiles.gate(ana.id);
        let sync = sync_with(&Arc::new(FakeAuth::new()), &profiles);

        let sign_in = tokio::spawn({
            let sync = sync.clone();
            let session = session_for(&ana);
            async move { sync.on_auth_event(AuthEvent::SignedIn, Some(session)).await }
        });
        let mut rx = sync.subscribe();
        rx.wait_for(|s| s.is_loading() && s.is_authenticated()).await.unwrap();

        let mut renewed = session_for(&ana);
        renewed.access_token = "renewed-token".into();
        sync.on_auth_event(AuthEvent::TokenRefreshed, Some(renewed)).await;
        assert!(sync.snapshot().is_loading());

        release.send(()).unwrap();
        sign_in.await.unwrap();

        let snap = sync.snapshot();
        assert!(!snap.is_loading());
        assert!(snap.is_admin());
        assert_eq!(snap.session().map(|s| s.access_token.as_str()), Some("renewed-token"));
    }

    #[tokio::test]
    async fn initial_check_completing_after_sign_out_wins() {
        let ana = user_named("ana");
        let auth = Arc::new(FakeAuth::new());
        let release = auth.gate_get_session();
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        let sync = sync_with(&auth, &profiles);
        let (watcher, seen) = watch_all(&sync);

        let init = tokio::spawn({
            let sync = sync.clone();
            async move { sync.initialize().await }
        });
        let mut rx = sync.subscribe();
        rx.wait_for(|s| s.phase == Phase::Loading).await.unwrap();

        sync.on_auth_event(AuthEvent::SignedOut, None).await;
        assert!(!sync.snapshot().is_authenticated());
        assert!(!sync.snapshot().is_loading());

        auth.set_session(Some(session_for(&ana)));
        release.send(()).unwrap();
        init.await.unwrap();
        tokio::task::yield_now().await;
        watcher.abort();

        let snap = sync.snapshot();
        assert!(!snap.is_loading());
        assert!(snap.is_authenticated());
        assert!(snap.is_admin());
        for s in seen.lock().unwrap().iter() {
            assert_consistent(s);
        }
    }

    #[tokio::test]
    async fn sign_out_completing_after_initial_check_wins() {
        let ana = user_named("ana");
        let auth = Arc::new(FakeAuth::with_session(session_for(&ana)));
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        let release = profiles.gate(ana.id);
        let sync = sync_with(&auth, &profiles);
        let (watcher, seen) = watch_all(&sync);

        let init = tokio::spawn({
            let sync = sync.clone();
            async move { sync.initialize().await }
        });
        let mut rx = sync.subscribe();
        rx.wait_for(|s| s.is_loading() && s.is_authenticated()).await.unwrap();

        auth.set_session(None);
        sync.on_auth_event(AuthEvent::SignedOut, None).await;

        release.send(()).unwrap();
        init.await.unwrap();
        tokio::task::yield_now().await;
        watcher.abort();

        let snap = sync.snapshot();
        assert!(!snap.is_loading());
        assert!(snap.user().is_none());
        assert!(snap.profile().is_none());
        assert!(!snap.is_admin());
        assert_eq!(profiles.fetch_count(), 1);
        for s in seen.lock().unwrap().iter() {
            assert_consistent(s);
            assert!(!s.is_admin(), "stale profile surfaced: {:?}", s);
        }
    }

    #[tokio::test]
    async fn slower_fetch_for_previous_user_is_discarded() {
        let ana = user_named("ana");
        let bob = user_named("bob");
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        profiles.insert(profile_for(&bob, Role::User));
        let release_ana = profiles.gate(ana.id);
        let sync = sync_with(&Arc::new(FakeAuth::new()), &profiles);

        let first = tokio::spawn({
            let sync = sync.clone();
            let session = session_for(&ana);
            async move { sync.on_auth_event(AuthEvent::SignedIn, Some(session)).await }
        });
        let mut rx = sync.subscribe();
        rx.wait_for(|s| s.is_authenticated()).await.unwrap();

        sync.on_auth_event(AuthEvent::SignedIn, Some(session_for(&bob))).await;
        release_ana.send(()).unwrap();
        first.await.unwrap();

        let snap = sync.snapshot();
        assert_eq!(snap.user().map(|u| u.id), Some(bob.id));
        assert!(!snap.is_admin());
        assert_consistent(&snap);
    }

    #[tokio::test]
    async fn attached_feed_drives_state() {
        let ana = user_named("ana");
        let auth = Arc::new(FakeAuth::new());
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Staff));
        let sync = sync_with(&auth, &profiles);
        let pump = sync.attach();

        auth.emit(AuthEvent::SignedIn, Some(session_for(&ana)));
        let mut rx = sync.subscribe();
        let snap = rx
            .wait_for(|s| s.is_authenticated() && !s.is_loading())
            .await
            .unwrap()
            .clone();
        assert!(snap.is_staff());

        auth.emit(AuthEvent::SignedOut, None);
        rx.wait_for(|s| !s.is_authenticated()).await.unwrap();
        pump.abort();
    }

    #[tokio::test]
    async fn flags_track_every_event_sequence() {
        let ana = user_named("ana");
        let bob = user_named("bob");
        let cy = user_named("cy");
        let profiles = Arc::new(FakeProfiles::new());
        profiles.insert(profile_for(&ana, Role::Admin));
        profiles.insert(profile_for(&bob, Role::Staff));
        profiles.fail_for(cy.id);
        let sync = sync_with(&Arc::new(FakeAuth::new()), &profiles);

        let steps = vec![
            (AuthEvent::SignedIn, Some(session_for(&ana))),
            (AuthEvent::TokenRefreshed, Some(session_for(&ana))),
            (AuthEvent::SignedIn, Some(session_for(&bob))),
            (AuthEvent::SignedOut, None),
            (AuthEvent::InitialSession, Some(session_for(&cy))),
            (AuthEvent::UserUpdated, Some(session_for(&bob))),
            (AuthEvent::SignedIn, None),
        ];

        for (event, session) in steps {
            let expected_user = match event {
                AuthEvent::SignedOut => None,
                _ => session.as_ref().map(|s| s.user.id),
            };
            sync.on_auth_event(event, session).await;
            let snap = sync.settled().await;
            assert_consistent(&snap);
            assert_eq!(snap.user().map(|u| u.id), expected_user);
        }
    }
}
