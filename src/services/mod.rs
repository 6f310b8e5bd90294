pub mod admin_services;
pub mod auth_services;
pub mod catalog_services;
pub mod session_sync;

pub use admin_services::AdminService;
pub use auth_services::{AuthApi, AuthChange, AuthEvent, AuthService};
pub use catalog_services::CatalogService;
pub use session_sync::{AuthSnapshot, Identity, Phase, SessionSync};
