use std::env;
use std::time::Duration;
use anyhow::{Context, Result};

pub const DEFAULT_BUCKET: &str = "lesson-images";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Optional refresh token used to restore a previous session at startup.
    pub refresh_token: Option<String>,
    pub bind_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub storage_bucket: String,
    pub max_upload_bytes: usize,
    /// Upper bound on any single backend request.
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn new(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into().trim().trim_end_matches('/').to_string(),
            supabase_anon_key: anon_key.into().trim().to_string(),
            refresh_token: None,
            bind_host: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            storage_bucket: DEFAULT_BUCKET.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self> {
        let supabase_url = env::var("SUPABASE_URL").context("SUPABASE_URL not set")?;
        let anon_key = env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY not set")?;
        let mut cfg = Self::new(supabase_url, anon_key);

        cfg.refresh_token = env::var("SUPABASE_REFRESH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        if let Ok(host) = env::var("BIND_HOST") {
            cfg.bind_host = host;
        }
        if let Ok(port) = env::var("PORT") {
            cfg.port = port.parse().context("PORT must be a valid port number")?;
        }
        if let Ok(origins) = env::var("ALLOWED_ORIGINS") {
            cfg.allowed_origins = parse_origins(&origins);
        }
        if let Ok(bucket) = env::var("STORAGE_BUCKET") {
            cfg.storage_bucket = bucket;
        }
        if let Ok(max) = env::var("MAX_UPLOAD_BYTES") {
            cfg.max_upload_bytes = max
                .parse()
                .context("MAX_UPLOAD_BYTES must be a byte count")?;
        }
        if let Ok(secs) = env::var("HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .context("HTTP_TIMEOUT_SECS must be a number of seconds")?;
            cfg.http_timeout = Duration::from_secs(secs.max(1));
        }

        Ok(cfg)
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.supabase_url)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn mask_key(k: &str) -> String {
    if k.len() <= 8 { "[REDACTED]".to_string() }
    else { format!("{}***{}", &k[..4], &k[k.len()-4..]) }
}
