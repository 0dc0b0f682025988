//! SQLite usage repository: one counter row per user plus the usage log.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use redflag_core::repository::usage::UsageRepository;
use redflag_types::error::RepositoryError;
use redflag_types::usage::{UsageCounter, UsageLogEntry};
use redflag_types::user::UserId;

use super::pool::DatabasePool;
use super::{format_datetime, query_error};

#[derive(Clone)]
pub struct SqliteUsageRepository {
    pool: DatabasePool,
}

impl SqliteUsageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn counter_from_row(
    user_id: UserId,
    row: &sqlx::sqlite::SqliteRow,
) -> Result<UsageCounter, RepositoryError> {
    let day_count: i64 = row.try_get("day_count").map_err(query_error)?;
    let month_count: i64 = row.try_get("month_count").map_err(query_error)?;
    Ok(UsageCounter {
        user_id,
        day_key: row.try_get("day_key").map_err(query_error)?,
        day_count: day_count.max(0) as u32,
        month_key: row.try_get("month_key").map_err(query_error)?,
        month_count: month_count.max(0) as u32,
    })
}

impl UsageRepository for SqliteUsageRepository {
    async fn get_counter(&self, user_id: &UserId) -> Result<Option<UsageCounter>, RepositoryError> {
        let row = sqlx::query(
            "SELECT day_key, day_count, month_key, month_count FROM usage_counters WHERE user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.map(|row| counter_from_row(*user_id, &row)).transpose()
    }

    async fn increment_counter(
        &self,
        user_id: &UserId,
        day_key: &str,
        month_key: &str,
    ) -> Result<UsageCounter, RepositoryError> {
        let row = sqlx::query(
            r#"INSERT INTO usage_counters (user_id, day_key, day_count, month_key, month_count, updated_at)
               VALUES (?, ?, 1, ?, 1, ?)
               ON CONFLICT (user_id) DO UPDATE SET
                   day_count = CASE WHEN usage_counters.day_key = excluded.day_key
                                    THEN usage_counters.day_count + 1 ELSE 1 END,
                   day_key = excluded.day_key,
                   month_count = CASE WHEN usage_counters.month_key = excluded.month_key
                                      THEN usage_counters.month_count + 1 ELSE 1 END,
                   month_key = excluded.month_key,
                   updated_at = excluded.updated_at
               RETURNING day_key, day_count, month_key, month_count"#,
        )
        .bind(user_id.to_string())
        .bind(day_key)
        .bind(month_key)
        .bind(format_datetime(&Utc::now()))
        .fetch_one(&self.pool.writer)
        .await
        .map_err(query_error)?;

        counter_from_row(*user_id, &row)
    }

    async fn append_log(&self, entry: &UsageLogEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO usage_logs (id, user_id, action, category, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(entry.user_id.to_string())
        .bind(&entry.action)
        .bind(&entry.category)
        .bind(format_datetime(&entry.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use redflag_core::repository::user::UserRepository;
    use redflag_core::usage::service::UsageService;
    use redflag_types::config::LimitsConfig;
    use redflag_types::error::UsageError;
    use redflag_types::usage::UsageLimits;
    use redflag_types::user::{User, UserType};

    use crate::sqlite::test_db::test_pool;
    use crate::sqlite::user::SqliteUserRepository;

    async fn setup() -> (SqliteUsageRepository, User) {
        let pool = test_pool().await;
        let user = User {
            id: UserId::new(),
            email: "usage@example.com".to_string(),
            password_hash: None,
            user_type: UserType::Guest,
            email_verified_at: None,
            created_at: Utc::now(),
        };
        SqliteUserRepository::new(pool.clone()).create_user(&user).await.unwrap();
        (SqliteUsageRepository::new(pool), user)
    }

    async fn count_logs(repo: &SqliteUsageRepository, user_id: &UserId) -> i64 {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM usage_logs WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&repo.pool.reader)
            .await
            .unwrap();
        row.try_get("n").unwrap()
    }

    #[tokio::test]
    async fn test_increment_counter_rolls_windows() {
        let (repo, user) = setup().await;
        assert!(repo.get_counter(&user.id).await.unwrap().is_none());

        let first = repo.increment_counter(&user.id, "2026-03-14", "2026-03").await.unwrap();
        assert_eq!((first.day_count, first.month_count), (1, 1));
        let second = repo.increment_counter(&user.id, "2026-03-14", "2026-03").await.unwrap();
        assert_eq!((second.day_count, second.month_count), (2, 2));

        // New day in the same month keeps the month count.
        let next_day = repo.increment_counter(&user.id, "2026-03-15", "2026-03").await.unwrap();
        assert_eq!((next_day.day_count, next_day.month_count), (1, 3));

        // New month restarts both.
        let next_month = repo.increment_counter(&user.id, "2026-04-01", "2026-04").await.unwrap();
        assert_eq!((next_month.day_count, next_month.month_count), (1, 1));

        assert_eq!(repo.get_counter(&user.id).await.unwrap(), Some(next_month));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_not_lost() {
        let (repo, user) = setup().await;
        let limits = LimitsConfig {
            guest: UsageLimits { daily: 100, monthly: 100 },
            regular: UsageLimits { daily: 100, monthly: 100 },
        };
        let service = Arc::new(UsageService::new(repo.clone(), limits));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let service = Arc::clone(&service);
                let user = user.clone();
                tokio::spawn(async move { service.record(&user, None).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let counter = repo.get_counter(&user.id).await.unwrap().unwrap();
        assert_eq!(counter.day_count, 20);
        assert_eq!(counter.month_count, 20);
        assert_eq!(count_logs(&repo, &user.id).await, 20);
    }

    #[tokio::test]
    async fn test_usage_service_against_sqlite() {
        let (repo, user) = setup().await;
        let limits = LimitsConfig {
            guest: UsageLimits { daily: 2, monthly: 10 },
            regular: UsageLimits { daily: 5, monthly: 10 },
        };
        let service = UsageService::new(repo.clone(), limits);

        service.record(&user, Some("conversation")).await.unwrap();
        service.record(&user, None).await.unwrap();
        let err = service.ensure_allowed(&user).await.unwrap_err();
        assert!(matches!(err, UsageError::DailyLimitReached { limit: 2, .. }));
        assert_eq!(count_logs(&repo, &user.id).await, 2);
    }
}
