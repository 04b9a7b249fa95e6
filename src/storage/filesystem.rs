//! Local directory storage backend
//!
//! Maps virtual paths below a server root onto the local file system.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncSeekExt;

use crate::client::SessionInfo;
use crate::error::StorageError;
use crate::navigate::paths::normalize;
use crate::storage::backend::{DirectoryListing, EntryInfo, ReadStream, Storage, WriteStream};

/// [`Storage`] rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    /// Uses `root` as the virtual `/`, creating it when missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Converts a virtual path to a real one below the root.
    ///
    /// Normalization already strips `..`; existing paths are additionally
    /// canonicalized so a symlink cannot point outside the root.
    fn real_path(&self, virtual_path: &str) -> Result<PathBuf, StorageError> {
        let normalized = normalize(virtual_path);
        let real = self.root.join(normalized.trim_start_matches('/'));

        if let Ok(canonical) = real.canonicalize() {
            if !canonical.starts_with(&self.root) {
                warn!("Rejected path outside server root: {}", virtual_path);
                return Err(StorageError::PathTraversal(normalized));
            }
        }
        Ok(real)
    }
}

fn entry_info(name: String, metadata: &std::fs::Metadata) -> EntryInfo {
    EntryInfo {
        name,
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    }
}

#[async_trait]
impl Storage for LocalFileSystem {
    async fn exists_directory(&self, _session: &SessionInfo, path: &str) -> bool {
        match self.real_path(path) {
            Ok(real) => fs::metadata(real).await.map(|m| m.is_dir()).unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn exists_file(&self, _session: &SessionInfo, path: &str) -> bool {
        match self.real_path(path) {
            Ok(real) => fs::metadata(real).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn download(&self, _session: &SessionInfo, path: &str) -> Result<ReadStream, StorageError> {
        let real = self.real_path(path)?;
        let file = fs::File::open(&real).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::FileNotFound(path.to_string()),
            _ => StorageError::IoError(e),
        })?;
        debug!("Opened {} for download", real.display());
        Ok(Box::new(file))
    }

    async fn upload(&self, _session: &SessionInfo, path: &str) -> Result<WriteStream, StorageError> {
        let real = self.real_path(path)?;
        let file = fs::File::create(&real).await?;
        debug!("Opened {} for upload", real.display());
        Ok(Box::new(file))
    }

    async fn upload_at(
        &self,
        _session: &SessionInfo,
        path: &str,
        offset: u64,
    ) -> Result<WriteStream, StorageError> {
        let real = self.real_path(path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&real)
            .await?;
        if file.metadata().await?.len() < offset {
            return Err(StorageError::InvalidOffset(path.to_string(), offset));
        }
        file.set_len(offset).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        debug!("Opened {} for upload at {}", real.display(), offset);
        Ok(Box::new(file))
    }

    async fn append(&self, _session: &SessionInfo, path: &str) -> Result<WriteStream, StorageError> {
        let real = self.real_path(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&real)
            .await?;
        debug!("Opened {} for append", real.display());
        Ok(Box::new(file))
    }

    async fn list(&self, _session: &SessionInfo, path: &str) -> Result<DirectoryListing, StorageError> {
        let real = self.real_path(path)?;
        let mut entries = fs::read_dir(&real).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::DirectoryNotFound(path.to_string()),
            _ => StorageError::IoError(e),
        })?;

        let mut listing = DirectoryListing::default();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            match entry.metadata().await {
                Ok(metadata) if metadata.is_dir() => {
                    listing.directories.push(entry_info(name, &metadata))
                }
                Ok(metadata) => listing.files.push(entry_info(name, &metadata)),
                Err(e) => warn!("Skipping {} while listing {}: {}", name, path, e),
            }
        }
        listing.directories.sort_by(|a, b| a.name.cmp(&b.name));
        listing.files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn file_size(&self, _session: &SessionInfo, path: &str) -> Result<u64, StorageError> {
        let real = self.real_path(path)?;
        match fs::metadata(&real).await {
            Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
            _ => Err(StorageError::FileNotFound(path.to_string())),
        }
    }

    async fn delete_file(&self, _session: &SessionInfo, path: &str) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        fs::remove_file(&real).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::FileNotFound(path.to_string()),
            _ => StorageError::IoError(e),
        })
    }

    async fn create_directory(&self, _session: &SessionInfo, path: &str) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        if fs::metadata(&real).await.is_ok() {
            return Err(StorageError::FileAlreadyExists(path.to_string()));
        }
        fs::create_dir(&real).await?;
        Ok(())
    }

    async fn remove_directory(&self, _session: &SessionInfo, path: &str) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        if real == self.root {
            return Err(StorageError::PermissionDenied(path.to_string()));
        }
        fs::remove_dir(&real).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::DirectoryNotFound(path.to_string()),
            _ => StorageError::IoError(e),
        })
    }

    async fn rename(&self, _session: &SessionInfo, from: &str, to: &str) -> Result<(), StorageError> {
        let source = self.real_path(from)?;
        let target = self.real_path(to)?;
        fs::rename(&source, &target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn session() -> SessionInfo {
        SessionInfo::new("127.0.0.1:50000".parse().unwrap())
    }

    #[tokio::test]
    async fn upload_append_download_round() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileSystem::new(dir.path()).unwrap();
        let info = session();

        let mut writer = storage.upload(&info, "/a.txt").await.unwrap();
        writer.write_all(b"hello ").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        let mut writer = storage.append(&info, "/a.txt").await.unwrap();
        writer.write_all(b"world").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        let mut reader = storage.download(&info, "/a.txt").await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "hello world");
        assert_eq!(storage.file_size(&info, "/a.txt").await.unwrap(), 11);
    }

    #[tokio::test]
    async fn upload_at_replaces_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("up.bin"), b"0123456789").unwrap();
        let storage = LocalFileSystem::new(dir.path()).unwrap();
        let info = session();

        let mut writer = storage.upload_at(&info, "/up.bin", 5).await.unwrap();
        writer.write_all(b"ABC").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);
        assert_eq!(std::fs::read(dir.path().join("up.bin")).unwrap(), b"01234ABC");

        assert!(matches!(
            storage.upload_at(&info, "/up.bin", 100).await,
            Err(StorageError::InvalidOffset(_, 100))
        ));
    }

    #[tokio::test]
    async fn list_splits_directories_and_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.bin"), [0u8; 3]).unwrap();
        let storage = LocalFileSystem::new(dir.path()).unwrap();

        let listing = storage.list(&session(), "/").await.unwrap();
        assert_eq!(listing.directories.len(), 1);
        assert_eq!(listing.directories[0].name, "sub");
        assert_eq!(listing.files[0].name, "b.bin");
        assert_eq!(listing.files[0].size, 3);
    }

    #[tokio::test]
    async fn parent_segments_stay_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileSystem::new(dir.path().join("root")).unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"x").unwrap();

        assert!(!storage.exists_file(&session(), "/../secret.txt").await);
        assert!(storage.exists_directory(&session(), "/..").await);
    }

    #[tokio::test]
    async fn refuses_to_remove_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileSystem::new(dir.path()).unwrap();
        assert!(matches!(
            storage.remove_directory(&session(), "/").await,
            Err(StorageError::PermissionDenied(_))
        ));
    }
}
