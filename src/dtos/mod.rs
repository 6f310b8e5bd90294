pub mod admin_dtos;
pub mod api_response;
pub mod auth_dtos;
pub mod catalog_dtos;

pub use api_response::ApiResponse;
