//! File system storage management
//!
//! The storage policy interface, a local directory backend and listing
//! formatters.

pub mod backend;
pub mod filesystem;
pub mod listing;

pub use backend::{DirectoryListing, EntryInfo, ReadStream, Storage, WriteStream};
pub use filesystem::LocalFileSystem;
