pub mod auth_guard;

pub use auth_guard::{Admin, SignedIn, Staff};
