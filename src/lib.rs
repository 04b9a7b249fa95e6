//! RAX FTP engine
//!
//! Per-connection FTP protocol engine: control session state machine, verb
//! dispatch, active and passive data connections, `AUTH TLS` upgrade of the
//! control channel and resumable transfers over a pluggable storage backend.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod navigate;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod tls;
pub mod transfer;

pub use config::ServerConfig;
pub use error::FtpServerError;
pub use server::{Server, ServerContext, SessionSettings};
