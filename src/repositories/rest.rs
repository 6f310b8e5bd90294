// src/repositories/rest.rs
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use urlencoding::encode;

use crate::config::AppConfig;
use crate::error::DataError;

/// Shared PostgREST / Storage plumbing. Every call carries the caller's
/// access token when there is one so row-level policies apply, and falls
/// back to the anon key otherwise.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    rest_url: String,
    storage_url: String,
    anon_key: String,
}

impl RestClient {
    pub fn new(config: &AppConfig, client: Client) -> Self {
        Self {
            client,
            rest_url: config.rest_url(),
            storage_url: config.storage_url(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    pub fn storage_url(&self) -> &str {
        &self.storage_url
    }

    /// Auth headers only. The body setter picks the content type: `.json()`
    /// for PostgREST, the object's MIME type for Storage uploads.
    fn headers(&self, token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", key);
        }
        let bearer = token.unwrap_or(&self.anon_key);
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", bearer)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// Request against `/rest/v1/{path}`; `path` may carry a query string.
    pub fn table(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/{}", self.rest_url, path.trim_start_matches('/'));
        self.client.request(method, url).headers(self.headers(token))
    }

    /// Request against `/rest/v1/rpc/{function}`.
    pub fn rpc(&self, function: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/rpc/{}", self.rest_url, function);
        self.client.post(url).headers(self.headers(token))
    }

    /// Request against `/storage/v1/{path}`.
    pub fn storage(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/{}", self.storage_url, path.trim_start_matches('/'));
        self.client.request(method, url).headers(self.headers(token))
    }

    /// Sends the request; non-2xx statuses become `DataError::Supabase`.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, DataError> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(DataError::Supabase {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(resp)
    }

    pub async fn send_text(&self, request: RequestBuilder) -> Result<String, DataError> {
        let resp = self.send(request).await?;
        Ok(resp.text().await?)
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DataError> {
        let text = self.send_text(request).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// PostgREST answers inserts/updates with `return=representation` as an
    /// array; the single-row operations want its first element.
    pub async fn send_single<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DataError> {
        let rows: Vec<T> = self.send_json(request).await?;
        rows.into_iter().next().ok_or(DataError::NotFound)
    }

    pub async fn send_empty(&self, request: RequestBuilder) -> Result<(), DataError> {
        self.send(request).await?;
        Ok(())
    }
}

/// `column=eq.value` with the value url-encoded.
pub fn eq(column: &str, value: impl ToString) -> String {
    format!("{}=eq.{}", column, encode(&value.to_string()))
}

/// `column=in.(a,b,c)`.
pub fn in_list<T: ToString>(column: &str, values: &[T]) -> String {
    let joined = values
        .iter()
        .map(|v| encode(&v.to_string()).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    format!("{}=in.({})", column, joined)
}

/// Extracts a readable message from a Supabase error body.
pub fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    if body.is_empty() { "empty response".to_string() } else { body.to_string() }
}

/// Total from a `Content-Range: 0-9/42` (or `*/42`) header.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next().and_then(|total| total.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use reqwest::header::CONTENT_TYPE;

    #[test]
    fn filters_are_encoded() {
        assert_eq!(eq("title", "a b"), "title=eq.a%20b");
        assert_eq!(in_list("lesson_id", &["x", "y"]), "lesson_id=in.(x,y)");
    }

    #[test]
    fn supabase_error_bodies_are_unwrapped() {
        assert_eq!(error_message(r#"{"message":"duplicate key"}"#), "duplicate key");
        assert_eq!(error_message(r#"{"error_description":"Invalid login credentials"}"#), "Invalid login credentials");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
        assert_eq!(error_message(""), "empty response");
    }

    #[test]
    fn json_requests_carry_one_content_type() {
        let cfg = AppConfig::new("https://demo.supabase.co", "anon-key");
        let rest = RestClient::new(&cfg, Client::new());
        let req = rest
            .table(Method::POST, "subjects", Some("user-token"))
            .json(&serde_json::json!({ "title": "Algebra" }))
            .build()
            .unwrap();

        let types: Vec<_> = req.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(types, vec!["application/json"]);
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer user-token");
        assert_eq!(req.headers()["apikey"], "anon-key");
    }

    #[test]
    fn anonymous_requests_use_the_anon_key() {
        let cfg = AppConfig::new("https://demo.supabase.co", "anon-key");
        let rest = RestClient::new(&cfg, Client::new());
        let req = rest.table(Method::GET, "subjects?select=*", None).build().unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer anon-key");
        assert!(req.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(req.url().as_str(), "https://demo.supabase.co/rest/v1/subjects?select=*");
    }

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range_total("0-9/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
    }
}
