//! UploadRepository trait: metadata of uploaded files.

use redflag_types::error::RepositoryError;
use redflag_types::upload::UploadedFile;
use redflag_types::user::UserId;
use uuid::Uuid;

pub trait UploadRepository: Send + Sync {
    fn create_upload(
        &self,
        file: &UploadedFile,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_upload(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<UploadedFile>, RepositoryError>> + Send;

    fn list_uploads(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<UploadedFile>, RepositoryError>> + Send;

    fn delete_upload(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
