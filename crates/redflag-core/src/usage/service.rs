//! Usage service: per-user-type limits on top of the counter repository.

use chrono::{DateTime, Utc};

use redflag_types::config::LimitsConfig;
use redflag_types::error::UsageError;
use redflag_types::usage::{UsageLogEntry, UsageSnapshot};
use redflag_types::user::User;

use crate::repository::usage::UsageRepository;

pub struct UsageService<R: UsageRepository> {
    repo: R,
    limits: LimitsConfig,
}

impl<R: UsageRepository> UsageService<R> {
    pub fn new(repo: R, limits: LimitsConfig) -> Self {
        Self { repo, limits }
    }

    pub async fn snapshot(&self, user: &User) -> Result<UsageSnapshot, UsageError> {
        let now = Utc::now();
        let counter = self.load(user, now).await?;
        Ok(super::snapshot(&counter, self.limits.for_user_type(user.user_type), now))
    }

    /// Fail with a limit error if the user cannot run another analysis.
    pub async fn ensure_allowed(&self, user: &User) -> Result<UsageSnapshot, UsageError> {
        let now = Utc::now();
        let counter = self.load(user, now).await?;
        super::check(&counter, self.limits.for_user_type(user.user_type), now)
    }

    /// Count one analysis and append an audit log entry.
    pub async fn record(
        &self,
        user: &User,
        category: Option<&str>,
    ) -> Result<UsageSnapshot, UsageError> {
        let now = Utc::now();
        let counter = self
            .repo
            .increment_counter(&user.id, &super::day_key(now), &super::month_key(now))
            .await
            .map_err(|e| UsageError::StorageError(e.to_string()))?;

        let entry = UsageLogEntry {
            user_id: user.id,
            action: "analysis".to_string(),
            category: category.map(str::to_string),
            created_at: now,
        };
        if let Err(e) = self.repo.append_log(&entry).await {
            tracing::warn!(user_id = %user.id, error = %e, "failed to append usage log");
        }

        tracing::debug!(
            user_id = %user.id,
            day_count = counter.day_count,
            month_count = counter.month_count,
            "usage recorded"
        );
        Ok(super::snapshot(&counter, self.limits.for_user_type(user.user_type), now))
    }

    async fn load(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<redflag_types::usage::UsageCounter, UsageError> {
        let counter = self
            .repo
            .get_counter(&user.id)
            .await
            .map_err(|e| UsageError::StorageError(e.to_string()))?;
        Ok(counter.unwrap_or_else(|| super::new_counter(user.id, now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::test_support::{InMemoryUsage, guest_user, regular_user};
    use redflag_types::usage::UsageLimits;

    fn limits() -> LimitsConfig {
        LimitsConfig {
            guest: UsageLimits { daily: 1, monthly: 5 },
            regular: UsageLimits { daily: 3, monthly: 5 },
        }
    }

    #[tokio::test]
    async fn test_limits_depend_on_user_type() {
        let repo = InMemoryUsage::default();
        let service = UsageService::new(repo.clone(), limits());
        let guest = guest_user();
        let regular = regular_user("r@example.com");

        service.ensure_allowed(&guest).await.unwrap();
        service.record(&guest, Some("job_posting")).await.unwrap();
        assert!(matches!(
            service.ensure_allowed(&guest).await,
            Err(UsageError::DailyLimitReached { limit: 1, .. })
        ));

        service.record(&regular, None).await.unwrap();
        let snap = service.ensure_allowed(&regular).await.unwrap();
        assert_eq!(snap.used_today, 1);
        assert_eq!(snap.daily_limit, 3);
        assert_eq!(repo.log_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_records_all_count() {
        let repo = InMemoryUsage::default();
        let service = Arc::new(UsageService::new(repo.clone(), limits()));
        let user = regular_user("busy@example.com");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = Arc::clone(&service);
                let user = user.clone();
                tokio::spawn(async move { service.record(&user, None).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let counter = repo.counter(&user.id).unwrap();
        assert_eq!(counter.day_count, 16);
        assert_eq!(counter.month_count, 16);
        assert_eq!(repo.log_count(), 16);
    }

    #[tokio::test]
    async fn test_snapshot_for_new_user_is_empty() {
        let service = UsageService::new(InMemoryUsage::default(), limits());
        let snap = service.snapshot(&regular_user("n@example.com")).await.unwrap();
        assert_eq!(snap.used_today, 0);
        assert_eq!(snap.used_this_month, 0);
        assert!(snap.day_resets_at > Utc::now());
    }
}
