// src/services/auth_services.rs
use std::fmt;

use async_trait::async_trait;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::config::AppConfig;
use crate::error::AuthError;
use crate::models::{Session, User};
use crate::repositories::rest::error_message;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

const MIN_PASSWORD_LEN: usize = 6;
const EVENT_BUFFER: usize = 32;

/// Kinds of change pushed on the auth feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthEvent::InitialSession => "INITIAL_SESSION",
            AuthEvent::SignedIn => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
            AuthEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEvent::UserUpdated => "USER_UPDATED",
            AuthEvent::PasswordRecovery => "PASSWORD_RECOVERY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Result of a sign-up: the session is absent while e-mail confirmation is pending.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

/// The backend's authentication surface.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Current session, renewed first when it has expired.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<SignUpOutcome, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    /// Push feed of sign-in, sign-out and refresh events.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(AuthError::InvalidInput("Please enter a valid email address".to_string()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Supabase GoTrue client holding the process-wide session.
pub struct AuthService {
    client: reqwest::Client,
    auth_url: String,
    anon_key: String,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
}

impl AuthService {
    pub fn new(config: &AppConfig, client: reqwest::Client) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            client,
            auth_url: config.auth_url(),
            anon_key: config.supabase_anon_key.clone(),
            current: RwLock::new(None),
            events,
        }
    }

    async fn store(&self, session: Option<Session>, event: AuthEvent) {
        *self.current.write().await = session.clone();
        debug!("auth event {} (session: {})", event, session.is_some());
        // no subscribers is fine
        let _ = self.events.send(AuthChange { event, session });
    }

    async fn token_request(&self, grant_type: &str, body: &Value) -> Result<Session, AuthError> {
        let url = format!("{}/token?grant_type={}", self.auth_url, grant_type);

        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if status == StatusCode::BAD_REQUEST && grant_type == "password" {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::Supabase(format!(
                "{} failed: {} {}",
                grant_type,
                status,
                error_message(&text)
            )));
        }

        let session: Session = serde_json::from_str(&text)
            .map_err(|e| AuthError::Supabase(format!("invalid json in token response: {}", e)))?;
        Ok(session.normalized())
    }

    /// Exchanges a stored refresh token for a fresh session.
    pub async fn restore(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let session = self
            .token_request("refresh_token", &serde_json::json!({ "refresh_token": refresh_token }))
            .await?;
        info!("restored session for user {}", session.user.id);
        self.store(Some(session.clone()), AuthEvent::InitialSession).await;
        Ok(session)
    }

    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .current
            .read()
            .await
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .ok_or(AuthError::NotAuthenticated)?;

        match self
            .token_request("refresh_token", &serde_json::json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(session) => {
                self.store(Some(session.clone()), AuthEvent::TokenRefreshed).await;
                Ok(session)
            }
            Err(e) => {
                warn!("session refresh failed, signing out locally: {}", e);
                self.store(None, AuthEvent::SignedOut).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl AuthApi for AuthService {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let current = self.current.read().await.clone();
        match current {
            Some(session) if session.is_expired() => {
                if session.refresh_token.is_none() {
                    self.store(None, AuthEvent::SignedOut).await;
                    return Ok(None);
                }
                self.refresh_session().await.map(Some)
            }
            other => Ok(other),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validate_credentials(email, password)?;
        let body = serde_json::json!({ "email": email.trim(), "password": password });
        let session = self.token_request("password", &body).await?;
        info!("signed in user {}", session.user.id);
        self.store(Some(session.clone()), AuthEvent::SignedIn).await;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<SignUpOutcome, AuthError> {
        validate_credentials(email, password)?;
        if display_name.trim().is_empty() {
            return Err(AuthError::InvalidInput("Name cannot be empty".to_string()));
        }

        #[derive(Serialize)]
        struct Body<'a> {
            email: &'a str,
            password: &'a str,
            data: Meta<'a>,
        }

        #[derive(Serialize)]
        struct Meta<'a> {
            name: &'a str,
        }

        let body = Body {
            email: email.trim(),
            password,
            data: Meta { name: display_name.trim() },
        };

        let url = format!("{}/signup", self.auth_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AuthError::Supabase(error_message(&text)));
        }

        let json_val: Value = serde_json::from_str(&text)
            .map_err(|e| AuthError::Supabase(format!("invalid json: {}", e)))?;
        let outcome = parse_signup(json_val)?;

        match &outcome.session {
            Some(session) => {
                info!("signed up and signed in user {}", outcome.user.id);
                self.store(Some(session.clone()), AuthEvent::SignedIn).await;
            }
            None => info!("signed up user {}, awaiting email confirmation", outcome.user.id),
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.current.read().await.clone();
        if let Some(session) = previous {
            let url = format!("{}/logout", self.auth_url);
            let result = self
                .client
                .post(&url)
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;
            match result {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => warn!("remote logout returned {}", resp.status()),
                Err(e) => warn!("remote logout failed: {}", e),
            }
        }
        self.store(None, AuthEvent::SignedOut).await;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

/// Sign-up answers with a full session when auto-confirm is on and with the
/// bare user (top level or under `user`) otherwise.
fn parse_signup(json_val: Value) -> Result<SignUpOutcome, AuthError> {
    if json_val.get("access_token").is_some() {
        let session: Session = serde_json::from_value(json_val)
            .map_err(|e| AuthError::Supabase(format!("invalid session in signup response: {}", e)))?;
        let session = session.normalized();
        return Ok(SignUpOutcome { user: session.user.clone(), session: Some(session) });
    }

    let user_val = match json_val.get("user") {
        Some(u) if !u.is_null() => u.clone(),
        _ => json_val,
    };
    let user: User = serde_json::from_value(user_val)
        .map_err(|_| AuthError::Supabase("signup returned no user id".to_string()))?;
    Ok(SignUpOutcome { user, session: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credentials_are_checked_before_network() {
        assert!(matches!(
            validate_credentials("not-an-email", "secret123"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_credentials("ana@example.com", "123"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(validate_credentials(" ana@example.com ", "secret123").is_ok());
    }

    #[test]
    fn signup_without_confirmation_has_no_session() {
        let raw = json!({
            "id": "6f1e3c1a-9b7e-4a57-8f7c-1d2b3c4d5e6f",
            "email": "ana@example.com",
            "user_metadata": { "name": "Ana" }
        });
        let outcome = parse_signup(raw).unwrap();
        assert!(outcome.session.is_none());
        assert_eq!(outcome.user.user_metadata.name.as_deref(), Some("Ana"));
    }

    #[test]
    fn signup_with_autoconfirm_returns_session() {
        let raw = json!({
            "access_token": "abc",
            "refresh_token": "def",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": "6f1e3c1a-9b7e-4a57-8f7c-1d2b3c4d5e6f", "email": "ana@example.com" }
        });
        let outcome = parse_signup(raw).unwrap();
        let session = outcome.session.unwrap();
        assert!(session.expires_at.is_some());
        assert_eq!(session.user, outcome.user);
    }

    #[test]
    fn event_names_match_wire_format() {
        assert_eq!(AuthEvent::TokenRefreshed.to_string(), "TOKEN_REFRESHED");
        assert_eq!(serde_json::to_value(AuthEvent::SignedOut).unwrap(), json!("SIGNED_OUT"));
    }

    #[tokio::test]
    async fn sign_out_without_session_still_emits_event() {
        let cfg = AppConfig::new("http://127.0.0.1:9", "anon");
        let svc = AuthService::new(&cfg, reqwest::Client::new());
        let mut rx = svc.subscribe();

        svc.sign_out().await.unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedOut);
        assert!(change.session.is_none());
        assert!(svc.get_session().await.unwrap().is_none());
    }
}
