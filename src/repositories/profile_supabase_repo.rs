// src/repositories/profile_supabase_repo.rs
use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use crate::error::{DataError, ProfileFetchError};
use crate::models::{Profile, ProfilePatch, Role};
use crate::repositories::rest::{eq, RestClient};

/// Access to the `profiles` table.
///
/// The session synchronizer and the admin service only talk to profiles
/// through this trait, so both can run against an in-memory store.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Single-row lookup by user id. `Ok(None)` when no row exists.
    async fn fetch_profile(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Option<Profile>, ProfileFetchError>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
        access_token: &str,
    ) -> Result<Profile, DataError>;

    async fn update_role(
        &self,
        user_id: Uuid,
        role: Role,
        access_token: &str,
    ) -> Result<Profile, DataError>;

    /// All profiles, newest first.
    async fn list_profiles(&self, access_token: &str) -> Result<Vec<Profile>, DataError>;
}

/// `ProfileSource` over PostgREST.
#[derive(Clone)]
pub struct ProfileSupabaseRepo {
    rest: RestClient,
}

impl ProfileSupabaseRepo {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl ProfileSource for ProfileSupabaseRepo {
    async fn fetch_profile(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Option<Profile>, ProfileFetchError> {
        let path = format!("profiles?{}&select=*", eq("id", user_id));
        let resp = self
            .rest
            .table(Method::GET, &path, Some(access_token))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProfileFetchError::Supabase(format!(
                "{} -> {}",
                status.as_u16(),
                text
            )));
        }

        let rows: Vec<Profile> = serde_json::from_str(&text)?;
        Ok(rows.into_iter().next())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
        access_token: &str,
    ) -> Result<Profile, DataError> {
        let path = format!("profiles?{}", eq("id", user_id));
        let req = self
            .rest
            .table(Method::PATCH, &path, Some(access_token))
            .header("Prefer", "return=representation")
            .json(patch);
        self.rest.send_single(req).await
    }

    async fn update_role(
        &self,
        user_id: Uuid,
        role: Role,
        access_token: &str,
    ) -> Result<Profile, DataError> {
        let path = format!("profiles?{}", eq("id", user_id));
        let req = self
            .rest
            .table(Method::PATCH, &path, Some(access_token))
            .header("Prefer", "return=representation")
            .json(&json!({ "role": role }));
        self.rest.send_single(req).await
    }

    async fn list_profiles(&self, access_token: &str) -> Result<Vec<Profile>, DataError> {
        let req = self.rest.table(
            Method::GET,
            "profiles?select=*&order=created_at.desc",
            Some(access_token),
        );
        self.rest.send_json(req).await
    }
}
