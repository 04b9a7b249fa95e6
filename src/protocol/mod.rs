//! FTP Protocol implementation
//!
//! Command model, reply codes, the verb registry and the built-in handlers.

pub mod commands;
pub mod handlers;
pub mod registry;
pub mod responses;

pub use commands::{Command, CommandResult, parse_command};
pub use registry::{CommandHandler, CommandRegistry};
