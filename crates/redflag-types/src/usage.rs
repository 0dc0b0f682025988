//! Usage counter types for per-day and per-month rate limiting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Allowed analyses per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimits {
    pub daily: u32,
    pub monthly: u32,
}

/// Day and month counters for one user.
///
/// `day_key` is `YYYY-MM-DD` and `month_key` is `YYYY-MM`, both in UTC.
/// A count only applies while its key matches the current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub user_id: UserId,
    pub day_key: String,
    pub day_count: u32,
    pub month_key: String,
    pub month_count: u32,
}

/// What the user has consumed and when the windows reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub used_today: u32,
    pub daily_limit: u32,
    pub used_this_month: u32,
    pub monthly_limit: u32,
    pub day_resets_at: DateTime<Utc>,
    pub month_resets_at: DateTime<Utc>,
}

impl UsageSnapshot {
    pub fn remaining_today(&self) -> u32 {
        self.daily_limit
            .saturating_sub(self.used_today)
            .min(self.monthly_limit.saturating_sub(self.used_this_month))
    }
}

/// An audit row appended for every counted action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub user_id: UserId,
    pub action: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}
