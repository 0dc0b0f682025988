//! Upload service: validates user files and moves them into the file store.
//!
//! The content type is always sniffed from the leading bytes. A declared
//! type from the client is only used as a cross-check.

use chrono::Utc;
use uuid::Uuid;

use redflag_types::error::{RepositoryError, UploadError};
use redflag_types::upload::{ALLOWED_CONTENT_TYPES, UploadedFile};
use redflag_types::user::User;

use crate::repository::upload::UploadRepository;
use crate::storage::FileStore;

const MAX_FILENAME_CHARS: usize = 100;

pub struct UploadService<R: UploadRepository, S: FileStore> {
    repo: R,
    store: S,
    max_bytes: usize,
}

fn storage(e: RepositoryError) -> UploadError {
    UploadError::StorageError(e.to_string())
}

/// Detect an allowed content type from magic bytes.
///
/// Anything that is valid UTF-8 without NUL bytes counts as `text/plain`.
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    if !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok() {
        return Some("text/plain");
    }
    None
}

/// Lowercase, drop parameters (`; charset=...`) and fold common aliases.
fn normalize_declared(declared: &str) -> String {
    let base = declared.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match base.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => base,
    }
}

/// Reduce a client filename to a safe single path segment.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    let cut: String = trimmed.chars().take(MAX_FILENAME_CHARS).collect();
    if cut.is_empty() || cut.chars().all(|c| c == '_') {
        "upload".to_string()
    } else {
        cut
    }
}

impl<R: UploadRepository, S: FileStore> UploadService<R, S> {
    pub fn new(repo: R, store: S, max_bytes: usize) -> Self {
        Self {
            repo,
            store,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn upload(
        &self,
        user: &User,
        filename: &str,
        declared_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadedFile, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }

        let declared = declared_type
            .map(normalize_declared)
            .filter(|d| !d.is_empty() && d != "application/octet-stream");
        if let Some(d) = &declared {
            if !ALLOWED_CONTENT_TYPES.contains(&d.as_str()) {
                return Err(UploadError::UnsupportedType(d.clone()));
            }
        }

        let detected = sniff_content_type(bytes).ok_or_else(|| {
            UploadError::UnsupportedType(
                declared
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
            )
        })?;
        if let Some(d) = declared {
            if d != detected {
                return Err(UploadError::TypeMismatch {
                    declared: d,
                    detected: detected.to_string(),
                });
            }
        }

        let id = Uuid::now_v7();
        let filename = sanitize_filename(filename);
        let storage_key = format!("{}/{}-{}", user.id, id, filename);
        self.store
            .put(&storage_key, bytes, detected)
            .await
            .map_err(|e| UploadError::StorageError(e.to_string()))?;

        let file = UploadedFile {
            id,
            user_id: user.id,
            filename,
            content_type: detected.to_string(),
            size_bytes: bytes.len() as u64,
            storage_key,
            created_at: Utc::now(),
        };
        if let Err(e) = self.repo.create_upload(&file).await {
            if let Err(cleanup) = self.store.delete(&file.storage_key).await {
                tracing::warn!(key = %file.storage_key, error = %cleanup, "failed to remove orphaned upload");
            }
            return Err(storage(e));
        }

        tracing::info!(
            file_id = %file.id,
            user_id = %user.id,
            content_type = %file.content_type,
            size_bytes = file.size_bytes,
            "file uploaded"
        );
        Ok(file)
    }

    /// Metadata of one of the user's uploads. Other users' files look missing.
    pub async fn get(&self, user: &User, id: &Uuid) -> Result<UploadedFile, UploadError> {
        self.repo
            .get_upload(id)
            .await
            .map_err(storage)?
            .filter(|f| f.user_id == user.id)
            .ok_or(UploadError::NotFound)
    }

    /// Metadata plus bytes.
    pub async fn read(&self, user: &User, id: &Uuid) -> Result<(UploadedFile, Vec<u8>), UploadError> {
        let file = self.get(user, id).await?;
        let bytes = self
            .store
            .get(&file.storage_key)
            .await
            .map_err(|e| UploadError::StorageError(e.to_string()))?;
        Ok((file, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryUploads, MemoryFileStore, regular_user};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn service(max_bytes: usize) -> (UploadService<InMemoryUploads, MemoryFileStore>, MemoryFileStore) {
        let store = MemoryFileStore::default();
        (
            UploadService::new(InMemoryUploads::default(), store.clone(), max_bytes),
            store,
        )
    }

    #[test]
    fn test_sniff_content_type() {
        assert_eq!(sniff_content_type(PNG), Some("image/png"));
        assert_eq!(sniff_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_content_type(b"GIF89a...."), Some("image/gif"));
        assert_eq!(sniff_content_type(b"RIFF\x10\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_content_type(b"%PDF-1.7\n"), Some("application/pdf"));
        assert_eq!(sniff_content_type("Hi, I'm Sam 👋".as_bytes()), Some("text/plain"));
        assert_eq!(sniff_content_type(&[0x00, 0x01, 0x02]), None);
        assert_eq!(sniff_content_type(&[0xC3, 0x28]), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("profile.png"), "profile.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\listing 1.jpg"), "listing_1.jpg");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("???"), "upload");
        assert_eq!(sanitize_filename(&"a".repeat(300)).len(), MAX_FILENAME_CHARS);
    }

    #[tokio::test]
    async fn test_upload_and_read_back() {
        let (service, store) = service(1024);
        let user = regular_user("u@example.com");
        let file = service
            .upload(&user, "shot.png", Some("image/png"), PNG)
            .await
            .unwrap();
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size_bytes, PNG.len() as u64);
        assert!(file.storage_key.starts_with(&user.id.to_string()));
        assert_eq!(store.keys(), vec![file.storage_key.clone()]);

        let (meta, bytes) = service.read(&user, &file.id).await.unwrap();
        assert_eq!(meta.id, file.id);
        assert_eq!(bytes, PNG);
    }

    #[tokio::test]
    async fn test_declared_type_must_match_content() {
        let (service, _) = service(1024);
        let user = regular_user("u@example.com");
        let err = service
            .upload(&user, "fake.pdf", Some("application/pdf"), PNG)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::TypeMismatch { .. }));

        // Missing or generic declared types fall back to sniffing.
        let file = service
            .upload(&user, "x", Some("application/octet-stream"), b"plain text")
            .await
            .unwrap();
        assert_eq!(file.content_type, "text/plain");
        let file = service.upload(&user, "y.jpg", Some("image/JPG"), &[0xFF, 0xD8, 0xFF, 0xDB]).await.unwrap();
        assert_eq!(file.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_rejects_empty_large_and_unsupported() {
        let (service, store) = service(8);
        let user = regular_user("u@example.com");
        assert!(matches!(
            service.upload(&user, "a.txt", None, b"").await,
            Err(UploadError::Empty)
        ));
        assert!(matches!(
            service.upload(&user, "a.png", None, PNG).await,
            Err(UploadError::TooLarge { max_bytes: 8 })
        ));
        assert!(matches!(
            service.upload(&user, "a.zip", Some("application/zip"), b"PK").await,
            Err(UploadError::UnsupportedType(t)) if t == "application/zip"
        ));
        assert!(matches!(
            service.upload(&user, "a.bin", None, &[0, 1, 2]).await,
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_files_are_owner_only() {
        let (service, _) = service(1024);
        let owner = regular_user("owner@example.com");
        let other = regular_user("other@example.com");
        let file = service.upload(&owner, "n.txt", None, b"notes").await.unwrap();
        assert!(matches!(
            service.get(&other, &file.id).await,
            Err(UploadError::NotFound)
        ));
    }
}
