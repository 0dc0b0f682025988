//! File store trait.
//!
//! Keys are relative, slash-separated paths chosen by the upload service
//! (`{user_id}/{file_id}-{filename}`). Implementations live in redflag-infra.

use redflag_types::error::StorageError;

pub trait FileStore: Send + Sync {
    fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, StorageError>> + Send;

    fn delete(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}
