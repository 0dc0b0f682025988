//! Local filesystem file store implementation.
//!
//! Directory layout:
//! ```text
//! {root}/
//!   {user_id}/
//!     {file_id}-{filename}
//! ```
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a
//! reader never observes a half-written upload.

use std::path::{Component, Path, PathBuf};

use redflag_core::storage::FileStore;
use redflag_types::error::StorageError;

#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage key to a path under `root`.
    ///
    /// Keys must be relative, slash-separated and free of `..`, `.` and
    /// backslashes.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.contains('\\') || key.contains('\0') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let relative = Path::new(key);
        let all_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !all_normal || key.split('/').any(|segment| segment.is_empty()) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {err}", path.display()))
}

impl FileStore for LocalFileStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&path, e));
        }

        tracing::debug!(key, content_type, size = data.len(), "stored upload");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Deleting a missing object is a no-op.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalFileStore) {
        let tmp = TempDir::new().unwrap();
        let store = LocalFileStore::new(tmp.path().to_path_buf());
        (tmp, store)
    }

    #[tokio::test]
    async fn put_then_get_returns_bytes() {
        let (tmp, store) = store();
        store
            .put("user-1/abc-profile.png", b"\x89PNG....", "image/png")
            .await
            .unwrap();

        let bytes = store.get("user-1/abc-profile.png").await.unwrap();
        assert_eq!(bytes, b"\x89PNG....");
        assert!(tmp.path().join("user-1").join("abc-profile.png").exists());
        assert!(!tmp.path().join("user-1").join("abc-profile.tmp").exists());
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let (_tmp, store) = store();
        store.put("u/a.txt", b"first", "text/plain").await.unwrap();
        store.put("u/a.txt", b"second", "text/plain").await.unwrap();
        assert_eq!(store.get("u/a.txt").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_tmp, store) = store();
        let err = store.get("u/missing.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_tmp, store) = store();
        store.put("u/a.txt", b"x", "text/plain").await.unwrap();
        store.delete("u/a.txt").await.unwrap();
        store.delete("u/a.txt").await.unwrap();
        assert!(matches!(
            store.get("u/a.txt").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let (_tmp, store) = store();
        for key in [
            "../outside.txt",
            "u/../../etc/passwd",
            "/etc/passwd",
            "u\\a.txt",
            "./a.txt",
            "u//a.txt",
            "",
        ] {
            let err = store.put(key, b"x", "text/plain").await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "key {key:?}");
        }
    }
}
