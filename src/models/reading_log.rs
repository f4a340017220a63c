use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One row per user per calendar day. Written by reading-session activity;
/// the streak engine only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReadingLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub log_date: NaiveDate,
    pub pages_read: i32,
    pub book_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// POST /api/logs: records a reading session; pages accumulate onto the
/// day's existing row.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordSessionRequest {
    /// Defaults to today in the user's timezone.
    pub log_date: Option<NaiveDate>,

    #[validate(range(min = 0, max = 5000, message = "pages_read must be 0-5000"))]
    pub pages_read: i32,

    pub book_id: Option<Uuid>,
}

/// PUT /api/logs/{date}: retroactive correction; replaces the day's total.
#[derive(Debug, Deserialize, Validate)]
pub struct CorrectLogRequest {
    #[validate(range(min = 0, max = 5000, message = "pages_read must be 0-5000"))]
    pub pages_read: i32,

    pub book_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LogRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
