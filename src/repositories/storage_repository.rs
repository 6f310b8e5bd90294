// src/repositories/storage_repository.rs
use reqwest::{Method, RequestBuilder};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;

use crate::error::DataError;
use crate::repositories::rest::RestClient;

#[derive(Clone)]
pub struct StorageRepository {
    rest: RestClient,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct UploadResp {
    #[serde(rename = "Key")]
    key: Option<String>,
}

impl StorageRepository {
    pub fn new(rest: RestClient, bucket: impl Into<String>) -> Self {
        Self { rest, bucket: bucket.into() }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn upload_request(&self, path: &str, bytes: Vec<u8>, content_type: &str, token: &str) -> RequestBuilder {
        let url_path = format!("object/{}/{}", self.bucket, path);
        self.rest
            .storage(Method::POST, &url_path, Some(token))
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "true")
            .body(bytes)
    }

    /// Uploads (overwriting) an object and returns its path inside the bucket.
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        token: &str,
    ) -> Result<String, DataError> {
        let req = self.upload_request(path, bytes, content_type, token);
        let resp: UploadResp = self.rest.send_json(req).await?;
        log::debug!("uploaded storage object {:?}", resp.key);
        Ok(path.to_string())
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.rest.storage_url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(), DataError> {
        let url_path = format!("object/{}", self.bucket);
        let req = self
            .rest
            .storage(Method::DELETE, &url_path, Some(token))
            .json(&json!({ "prefixes": [path] }));
        self.rest.send_empty(req).await
    }
}
