use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Cached streak snapshot plus the freeze ledger. `current_streak` and
/// `longest_streak` are derived values refreshed on every read; the freeze
/// counters are the authoritative ledger and only change under the per-user
/// row lock.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StreakRow {
    pub user_id: Uuid,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub freezes_available: i32,
    pub freezes_used: i32,
    pub last_computed_date: Option<NaiveDate>,
    pub last_grant_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable record of one spent freeze.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[allow(dead_code)]
pub struct FreezeConsumption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub covered_date: NaiveDate,
    pub consumed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GoalPreferences {
    pub user_id: Uuid,
    pub daily_page_goal: i32,
    pub freeze_allowance: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertGoalRequest {
    #[validate(range(min = 1, max = 1000, message = "daily_page_goal must be 1-1000"))]
    pub daily_page_goal: i32,

    #[validate(range(min = 0, max = 30, message = "freeze_allowance must be 0-30"))]
    pub freeze_allowance: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct StreakResponse {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub freezes_available: i32,
    pub freezes_used: i32,
    pub as_of: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UseFreezeRequest {
    pub target_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
