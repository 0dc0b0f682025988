//! UsageRepository trait: day/month counters and the usage audit log.

use redflag_types::error::RepositoryError;
use redflag_types::usage::{UsageCounter, UsageLogEntry};
use redflag_types::user::UserId;

pub trait UsageRepository: Send + Sync {
    fn get_counter(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<UsageCounter>, RepositoryError>> + Send;

    /// Atomically count one action in the `day_key`/`month_key` windows and
    /// return the updated row. A window with a different stored key restarts
    /// at 1, matching [`crate::usage::increment`].
    fn increment_counter(
        &self,
        user_id: &UserId,
        day_key: &str,
        month_key: &str,
    ) -> impl std::future::Future<Output = Result<UsageCounter, RepositoryError>> + Send;

    fn append_log(
        &self,
        entry: &UsageLogEntry,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
