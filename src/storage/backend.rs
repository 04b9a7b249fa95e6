//! Storage policy interface
//!
//! The protocol engine never touches a file system directly; every lookup and
//! every byte stream goes through a [`Storage`] implementation.

use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::client::SessionInfo;
use crate::error::StorageError;

pub type ReadStream = Box<dyn AsyncRead + Send + Unpin>;
pub type WriteStream = Box<dyn AsyncWrite + Send + Unpin>;

/// One directory entry as reported by [`Storage::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
}

/// Directory contents split into sub-directories and files.
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    pub directories: Vec<EntryInfo>,
    pub files: Vec<EntryInfo>,
}

/// Backend consulted by command handlers and by the transfer engine.
///
/// Paths are virtual, absolute and normalized (see [`crate::navigate::paths`]).
/// Concurrent access to one path from several sessions is the backend's
/// concern.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn exists_directory(&self, session: &SessionInfo, path: &str) -> bool;

    async fn exists_file(&self, session: &SessionInfo, path: &str) -> bool;

    /// Opens `path` for reading from its first byte.
    async fn download(&self, session: &SessionInfo, path: &str) -> Result<ReadStream, StorageError>;

    /// Creates or truncates `path` for writing.
    async fn upload(&self, session: &SessionInfo, path: &str) -> Result<WriteStream, StorageError>;

    /// Opens `path` for writing at byte `offset`, dropping whatever followed
    /// it. Fails with [`StorageError::InvalidOffset`] when the file is shorter.
    async fn upload_at(
        &self,
        session: &SessionInfo,
        path: &str,
        offset: u64,
    ) -> Result<WriteStream, StorageError>;

    /// Opens `path` for writing at its end, creating it when missing.
    async fn append(&self, session: &SessionInfo, path: &str) -> Result<WriteStream, StorageError>;

    async fn list(&self, session: &SessionInfo, path: &str) -> Result<DirectoryListing, StorageError>;

    async fn file_size(&self, session: &SessionInfo, path: &str) -> Result<u64, StorageError>;

    async fn delete_file(&self, session: &SessionInfo, path: &str) -> Result<(), StorageError>;

    async fn create_directory(&self, session: &SessionInfo, path: &str) -> Result<(), StorageError>;

    async fn remove_directory(&self, session: &SessionInfo, path: &str) -> Result<(), StorageError>;

    async fn rename(&self, session: &SessionInfo, from: &str, to: &str) -> Result<(), StorageError>;
}
