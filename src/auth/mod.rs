//! Authentication system
//!
//! The authorization policy interface and a static credential table.

pub mod credentials;
pub mod validator;

pub use credentials::StaticCredentials;
pub use validator::{Authorization, validate_password, validate_user};
