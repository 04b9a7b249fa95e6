//! Server core functionality
//!
//! The listener and connection manager plus the context shared by sessions.

pub mod context;
pub mod core;

pub use context::{ServerContext, SessionSettings};
pub use core::Server;
