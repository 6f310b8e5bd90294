pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use reqwest::Client;

use crate::config::AppConfig;
use crate::repositories::{
    CommentRepository, LessonRepository, ProfileSource, ProgressRepository, RestClient,
    StorageRepository, SubjectRepository,
};
use crate::services::{AdminService, AuthApi, CatalogService, SessionSync};

/// Shared by every worker; cloned into each `App`.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: Arc<dyn AuthApi>,
    pub sync: Arc<SessionSync>,
    pub catalog: CatalogService,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        http_client: Client,
        auth: Arc<dyn AuthApi>,
        profiles: Arc<dyn ProfileSource>,
        sync: Arc<SessionSync>,
    ) -> Self {
        let rest = RestClient::new(&config, http_client);
        let subjects = SubjectRepository::new(rest.clone());
        let lessons = LessonRepository::new(rest.clone());

        let catalog = CatalogService::new(
            auth.clone(),
            profiles.clone(),
            subjects.clone(),
            lessons.clone(),
            CommentRepository::new(rest.clone()),
            ProgressRepository::new(rest.clone()),
        );
        let admin = AdminService::new(
            auth.clone(),
            profiles,
            sync.clone(),
            subjects,
            lessons,
            StorageRepository::new(rest, config.storage_bucket.clone()),
            config.max_upload_bytes,
        );

        Self { config, auth, sync, catalog, admin }
    }
}
