//! Error handling
//!
//! Defines error types and handling for the FTP server.

pub mod handlers;
pub mod types;

pub use handlers::{error_to_ftp_code, storage_error_code, transfer_error_code};
pub use types::*;
