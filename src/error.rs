// src/error.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Sign-in, sign-up and session failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("supabase error: {0}")]
    Supabase(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("you must be logged in to perform this action")]
    NotAuthenticated,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Single-row profile lookup failed at the backend.
#[derive(Debug, Error)]
pub enum ProfileFetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("supabase error: {0}")]
    Supabase(String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("profile lookup timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Role check failed for a gated operation.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("only administrators can perform this action")]
    AdminRequired,
    #[error("only staff members can perform this action")]
    StaffRequired,
    #[error("could not verify permissions: {0}")]
    Unverifiable(String),
}

/// Generic CRUD failure from the backend.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("supabase error {status}: {message}")]
    Supabase { status: u16, message: String },
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Profile(#[from] ProfileFetchError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("still loading")]
    Loading,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::NotAuthenticated)
            | AppError::Auth(AuthError::InvalidCredentials)
            | AppError::Auth(AuthError::Token(_)) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::BAD_GATEWAY,
            AppError::Profile(_) => StatusCode::BAD_GATEWAY,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Data(DataError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Data(DataError::Invalid(_)) => StatusCode::BAD_REQUEST,
            AppError::Data(DataError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Data(DataError::UnsupportedMediaType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::Data(DataError::Supabase { status, .. }) if *status == 409 => {
                StatusCode::CONFLICT
            }
            AppError::Data(_) => StatusCode::BAD_GATEWAY,
            AppError::Loading => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "status": "error",
            "message": self.to_string(),
            "data": null,
        }))
    }
}
