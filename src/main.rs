// src/main.rs
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info, warn};
use reqwest::Client;

use lessonhub::AppState;
use lessonhub::config::{mask_key, AppConfig};
use lessonhub::handlers;
use lessonhub::repositories::{ProfileSupabaseRepo, RestClient};
use lessonhub::services::{AuthApi, AuthService, SessionSync};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Supabase URL: {}", config.supabase_url);
    info!("Supabase Key: {}", mask_key(&config.supabase_anon_key));

    let http_client = match Client::builder()
        .user_agent("lessonhub/0.1")
        .connect_timeout(Duration::from_secs(5).min(config.http_timeout))
        .timeout(config.http_timeout)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build http client: {}", e);
            std::process::exit(1);
        }
    };

    let auth_service = Arc::new(AuthService::new(&config, http_client.clone()));
    if let Some(refresh_token) = config.refresh_token.as_deref() {
        if let Err(e) = auth_service.restore(refresh_token).await {
            warn!("Could not restore stored session, starting signed out: {}", e);
        }
    }
    let auth: Arc<dyn AuthApi> = auth_service;

    let profiles = Arc::new(ProfileSupabaseRepo::new(RestClient::new(&config, http_client.clone())));
    let sync = Arc::new(
        SessionSync::new(auth.clone(), profiles.clone()).with_profile_timeout(config.http_timeout),
    );

    // feed first, so nothing emitted during the startup check is missed
    let _feed = sync.attach();
    {
        let sync = sync.clone();
        tokio::spawn(async move { sync.initialize().await });
    }

    let state = web::Data::new(AppState::new(config.clone(), http_client, auth, profiles, sync));
    let bind_address = config.bind_address();
    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["authorization", "content-type", "accept", "x-requested-with"])
            .supports_credentials()
            .max_age(3600);

        for origin in &config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}
