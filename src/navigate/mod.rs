//! Navigate module
//!
//! Virtual path handling and the two-step resolution used by directory and
//! file commands.

mod operations;
pub mod paths;

pub use operations::{change_directory, resolve_directory, resolve_file, resolve_upload_target};
