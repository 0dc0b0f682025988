//! SQLite repository for uploaded file metadata.

use sqlx::Row;
use uuid::Uuid;

use redflag_core::repository::upload::UploadRepository;
use redflag_types::error::RepositoryError;
use redflag_types::upload::UploadedFile;
use redflag_types::user::UserId;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

#[derive(Clone)]
pub struct SqliteUploadRepository {
    pool: DatabasePool,
}

impl SqliteUploadRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct UploadRow {
    id: String,
    user_id: String,
    filename: String,
    content_type: String,
    size_bytes: i64,
    storage_key: String,
    created_at: String,
}

impl UploadRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            filename: row.try_get("filename")?,
            content_type: row.try_get("content_type")?,
            size_bytes: row.try_get("size_bytes")?,
            storage_key: row.try_get("storage_key")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_file(self) -> Result<UploadedFile, RepositoryError> {
        Ok(UploadedFile {
            id: parse_uuid(&self.id, "file id")?,
            user_id: UserId(parse_uuid(&self.user_id, "user_id")?),
            filename: self.filename,
            content_type: self.content_type,
            size_bytes: self.size_bytes.max(0) as u64,
            storage_key: self.storage_key,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl UploadRepository for SqliteUploadRepository {
    async fn create_upload(&self, file: &UploadedFile) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO uploaded_files (id, user_id, filename, content_type, size_bytes, storage_key, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(file.id.to_string())
        .bind(file.user_id.to_string())
        .bind(&file.filename)
        .bind(&file.content_type)
        .bind(file.size_bytes as i64)
        .bind(&file.storage_key)
        .bind(format_datetime(&file.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn get_upload(&self, id: &Uuid) -> Result<Option<UploadedFile>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM uploaded_files WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| UploadRow::from_row(&row).map_err(query_error)?.into_file())
            .transpose()
    }

    async fn list_uploads(&self, user_id: &UserId) -> Result<Vec<UploadedFile>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM uploaded_files WHERE user_id = ? ORDER BY created_at DESC")
            .bind(user_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut files = Vec::with_capacity(rows.len());
        for row in &rows {
            files.push(UploadRow::from_row(row).map_err(query_error)?.into_file()?);
        }
        Ok(files)
    }

    async fn delete_upload(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM uploaded_files WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use redflag_core::repository::user::UserRepository;
    use redflag_types::user::{User, UserType};

    use crate::sqlite::test_db::test_pool;
    use crate::sqlite::user::SqliteUserRepository;

    #[tokio::test]
    async fn test_upload_metadata_lifecycle() {
        let pool = test_pool().await;
        let user = User {
            id: UserId::new(),
            email: "files@example.com".to_string(),
            password_hash: None,
            user_type: UserType::Regular,
            email_verified_at: None,
            created_at: Utc::now(),
        };
        SqliteUserRepository::new(pool.clone()).create_user(&user).await.unwrap();
        let repo = SqliteUploadRepository::new(pool);

        let id = Uuid::now_v7();
        let file = UploadedFile {
            id,
            user_id: user.id,
            filename: "ad.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 2048,
            storage_key: format!("{}/{}-ad.pdf", user.id, id),
            created_at: Utc::now(),
        };
        repo.create_upload(&file).await.unwrap();

        let loaded = repo.get_upload(&id).await.unwrap().unwrap();
        assert_eq!(loaded.size_bytes, 2048);
        assert_eq!(loaded.storage_key, file.storage_key);
        assert_eq!(repo.list_uploads(&user.id).await.unwrap().len(), 1);

        repo.delete_upload(&id).await.unwrap();
        assert!(repo.get_upload(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_requires_existing_user() {
        let repo = SqliteUploadRepository::new(test_pool().await);
        let file = UploadedFile {
            id: Uuid::now_v7(),
            user_id: UserId::new(),
            filename: "x.txt".to_string(),
            content_type: "text/plain".to_string(),
            size_bytes: 1,
            storage_key: "orphan/x.txt".to_string(),
            created_at: Utc::now(),
        };
        assert!(repo.create_upload(&file).await.is_err());
    }
}
