use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Identity record issued by Supabase Auth (`auth.users`).
/// Read-only from our side; changes only go through the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub name: Option<String>,
}

/// Credential bundle returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    pub user: User,
}

/// Claims carried by a Supabase access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// subject / user id
    pub sub: String,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub role: Option<String>,
    pub email: Option<String>,
}

/// Seconds before expiry at which a session is already treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 10;

impl Session {
    /// Fills `expires_at` when the backend left it out, first from
    /// `expires_in`, then from the token's own `exp` claim.
    pub fn normalized(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self
                .expires_in
                .map(|secs| Utc::now().timestamp() + secs)
                .or_else(|| self.claims().ok().and_then(|c| c.exp));
        }
        self
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(at) => at - EXPIRY_MARGIN_SECS <= now,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Decodes the access token payload. The signature is not checked: the
    /// backend verifies it on every request, we only read expiry and subject.
    pub fn claims(&self) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        let data = decode::<AccessClaims>(
            &self.access_token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: Some("ana@example.com".into()),
            user_metadata: UserMetadata { name: Some("Ana".into()) },
        }
    }

    fn token_for(user: &User, exp: i64) -> String {
        let claims = AccessClaims {
            sub: user.id.to_string(),
            exp: Some(exp),
            iat: None,
            role: Some("authenticated".into()),
            email: user.email.clone(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"other-secret")).unwrap()
    }

    #[test]
    fn expiry_falls_back_to_token_claim() {
        let user = user();
        let session = Session {
            access_token: token_for(&user, 4_102_444_800),
            refresh_token: None,
            token_type: Some("bearer".into()),
            expires_in: None,
            expires_at: None,
            user: user.clone(),
        }
        .normalized();

        assert_eq!(session.expires_at, Some(4_102_444_800));
        assert_eq!(session.claims().unwrap().sub, user.id.to_string());
        assert!(!session.is_expired());
    }

    #[test]
    fn margin_counts_as_expired() {
        let session = Session {
            access_token: "x".into(),
            refresh_token: None,
            token_type: None,
            expires_in: None,
            expires_at: Some(1_000),
            user: user(),
        };
        assert!(session.is_expired_at(995));
        assert!(!session.is_expired_at(900));
    }

    #[test]
    fn user_metadata_defaults_when_missing() {
        let raw = r#"{"id":"6f1e3c1a-9b7e-4a57-8f7c-1d2b3c4d5e6f","email":null}"#;
        let user: User = serde_json::from_str(raw).unwrap();
        assert_eq!(user.user_metadata.name, None);
    }
}
