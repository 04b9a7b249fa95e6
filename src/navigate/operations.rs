//! Navigation operations implementation
//!
//! Argument resolution shared by the handlers: a target is looked up relative
//! to the working directory first, then as given.

use crate::client::SessionInfo;
use crate::error::NavigateError;
use crate::navigate::paths::{file_name, join, normalize, parent};
use crate::storage::Storage;

/// Candidate virtual paths for `arg`, in lookup order.
fn candidates(cwd: &str, arg: &str) -> [String; 2] {
    [join(cwd, arg), normalize(arg)]
}

/// Resolves `arg` to an existing directory.
pub async fn resolve_directory(
    storage: &dyn Storage,
    session: &SessionInfo,
    cwd: &str,
    arg: &str,
) -> Result<String, NavigateError> {
    if arg.trim().is_empty() {
        return Err(NavigateError::EmptyPath);
    }
    for candidate in candidates(cwd, arg) {
        if storage.exists_directory(session, &candidate).await {
            return Ok(candidate);
        }
    }
    Err(NavigateError::DirectoryNotFound(arg.to_string()))
}

/// Resolves `arg` to an existing file.
pub async fn resolve_file(
    storage: &dyn Storage,
    session: &SessionInfo,
    cwd: &str,
    arg: &str,
) -> Result<String, NavigateError> {
    if arg.trim().is_empty() {
        return Err(NavigateError::EmptyPath);
    }
    for candidate in candidates(cwd, arg) {
        if storage.exists_file(session, &candidate).await {
            return Ok(candidate);
        }
    }
    Err(NavigateError::FileNotFound(arg.to_string()))
}

/// Resolves the target of an upload: the parent directory must exist, the
/// file itself need not. Returns the full virtual path of the target.
pub async fn resolve_upload_target(
    storage: &dyn Storage,
    session: &SessionInfo,
    cwd: &str,
    arg: &str,
) -> Result<String, NavigateError> {
    if arg.trim().is_empty() {
        return Err(NavigateError::EmptyPath);
    }
    for candidate in candidates(cwd, arg) {
        if file_name(&candidate).is_empty() {
            return Err(NavigateError::EmptyPath);
        }
        let folder = match parent(&candidate) {
            "" => "/",
            folder => folder,
        };
        if storage.exists_directory(session, folder).await {
            return Ok(candidate);
        }
    }
    Err(NavigateError::DirectoryNotFound(arg.to_string()))
}

/// Changes the working directory of a session; the result is the new path.
pub async fn change_directory(
    storage: &dyn Storage,
    session: &SessionInfo,
    cwd: &str,
    target: &str,
) -> Result<String, NavigateError> {
    resolve_directory(storage, session, cwd, target).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::{DirectoryListing, LocalFileSystem, ReadStream, WriteStream};

    fn fixture() -> (tempfile::TempDir, LocalFileSystem, SessionInfo) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pub/docs")).unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("pub/readme.txt"), b"hi").unwrap();
        let fs = LocalFileSystem::new(dir.path()).unwrap();
        let session = SessionInfo::new("127.0.0.1:50000".parse().unwrap());
        (dir, fs, session)
    }

    #[tokio::test]
    async fn prefers_path_relative_to_cwd() {
        let (_dir, fs, session) = fixture();
        let resolved = resolve_directory(&fs, &session, "/pub", "docs").await.unwrap();
        assert_eq!(resolved, "/pub/docs");
    }

    #[tokio::test]
    async fn falls_back_to_argument_as_given() {
        let (_dir, fs, session) = fixture();
        let resolved = resolve_directory(&fs, &session, "/pub/docs", "/docs").await.unwrap();
        // "/pub/docs/docs" does not exist, "/docs" does
        assert_eq!(resolved, "/docs");
    }

    #[tokio::test]
    async fn missing_and_blank_targets_fail() {
        let (_dir, fs, session) = fixture();
        assert!(matches!(
            resolve_directory(&fs, &session, "/", "nowhere").await,
            Err(NavigateError::DirectoryNotFound(_))
        ));
        assert!(matches!(
            resolve_directory(&fs, &session, "/", "  ").await,
            Err(NavigateError::EmptyPath)
        ));
    }

    #[tokio::test]
    async fn resolves_files_and_upload_targets() {
        let (_dir, fs, session) = fixture();
        assert_eq!(
            resolve_file(&fs, &session, "/pub", "readme.txt").await.unwrap(),
            "/pub/readme.txt"
        );
        assert_eq!(
            resolve_upload_target(&fs, &session, "/pub", "new.bin").await.unwrap(),
            "/pub/new.bin"
        );
        assert_eq!(
            resolve_upload_target(&fs, &session, "/", "pub/docs/a.txt").await.unwrap(),
            "/pub/docs/a.txt"
        );
        assert!(resolve_upload_target(&fs, &session, "/", "missing/a.txt").await.is_err());
    }

    /// In-memory directory set that records every lookup it serves.
    struct RecordingStorage {
        directories: Vec<&'static str>,
        lookups: std::sync::Mutex<Vec<(String, Option<String>)>>,
    }

    impl RecordingStorage {
        fn new(directories: Vec<&'static str>) -> Self {
            Self {
                directories,
                lookups: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn lookups(&self) -> Vec<(String, Option<String>)> {
            self.lookups.lock().unwrap().clone()
        }
    }

    fn denied(path: &str) -> StorageError {
        StorageError::PermissionDenied(path.to_string())
    }

    #[async_trait::async_trait]
    impl Storage for RecordingStorage {
        async fn exists_directory(&self, session: &SessionInfo, path: &str) -> bool {
            self.lookups
                .lock()
                .unwrap()
                .push((path.to_string(), session.username.clone()));
            self.directories.iter().any(|d| *d == path)
        }

        async fn exists_file(&self, _session: &SessionInfo, _path: &str) -> bool {
            false
        }

        async fn download(&self, _session: &SessionInfo, path: &str) -> Result<ReadStream, StorageError> {
            Err(denied(path))
        }

        async fn upload(&self, _session: &SessionInfo, path: &str) -> Result<WriteStream, StorageError> {
            Err(denied(path))
        }

        async fn upload_at(
            &self,
            _session: &SessionInfo,
            path: &str,
            _offset: u64,
        ) -> Result<WriteStream, StorageError> {
            Err(denied(path))
        }

        async fn append(&self, _session: &SessionInfo, path: &str) -> Result<WriteStream, StorageError> {
            Err(denied(path))
        }

        async fn list(&self, _session: &SessionInfo, path: &str) -> Result<DirectoryListing, StorageError> {
            Err(denied(path))
        }

        async fn file_size(&self, _session: &SessionInfo, path: &str) -> Result<u64, StorageError> {
            Err(denied(path))
        }

        async fn delete_file(&self, _session: &SessionInfo, path: &str) -> Result<(), StorageError> {
            Err(denied(path))
        }

        async fn create_directory(&self, _session: &SessionInfo, path: &str) -> Result<(), StorageError> {
            Err(denied(path))
        }

        async fn remove_directory(&self, _session: &SessionInfo, path: &str) -> Result<(), StorageError> {
            Err(denied(path))
        }

        async fn rename(&self, _session: &SessionInfo, from: &str, _to: &str) -> Result<(), StorageError> {
            Err(denied(from))
        }
    }

    #[tokio::test]
    async fn lookups_go_through_storage_in_order() {
        let storage = RecordingStorage::new(vec!["/docs"]);
        let mut session = SessionInfo::new("127.0.0.1:50001".parse().unwrap());
        session.username = Some("alice".to_string());

        let resolved = change_directory(&storage, &session, "/pub", "docs").await.unwrap();
        assert_eq!(resolved, "/docs");
        assert_eq!(
            storage.lookups(),
            vec![
                ("/pub/docs".to_string(), Some("alice".to_string())),
                ("/docs".to_string(), Some("alice".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn first_hit_wins() {
        let storage = RecordingStorage::new(vec!["/pub/docs", "/docs"]);
        let session = SessionInfo::new("127.0.0.1:50002".parse().unwrap());

        let resolved = change_directory(&storage, &session, "/pub", "docs").await.unwrap();
        assert_eq!(resolved, "/pub/docs");
        assert_eq!(storage.lookups().len(), 1);
    }
}
