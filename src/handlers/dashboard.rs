use axum::{extract::State, Extension, Json};
use chrono::Duration;
use serde::Serialize;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::handlers::reading_logs::user_today;
use crate::models::book::BookStatus;
use crate::models::reading_log::ReadingLog;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub books_reading: i64,
    pub books_finished: i64,
    pub books_want_to_read: i64,
    pub pages_last_7_days: i64,
    pub pages_last_30_days: i64,
    pub current_streak: Option<i32>,
    pub longest_streak: Option<i32>,
    pub recent_logs: Vec<ReadingLog>,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DashboardResponse>> {
    let today = user_today(&state.db, auth_user.id).await?;

    let status_counts = sqlx::query_as::<_, (BookStatus, i64)>(
        "SELECT status, COUNT(*) FROM books WHERE user_id = $1 GROUP BY status",
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    let count_for = |wanted: &BookStatus| {
        status_counts
            .iter()
            .find(|(status, _)| status == wanted)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    let (pages_last_7_days, pages_last_30_days) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            COALESCE(SUM(pages_read) FILTER (WHERE log_date > $2), 0),
            COALESCE(SUM(pages_read), 0)
        FROM reading_logs
        WHERE user_id = $1 AND log_date > $3 AND log_date <= $4
        "#,
    )
    .bind(auth_user.id)
    .bind(today - Duration::days(7))
    .bind(today - Duration::days(30))
    .bind(today)
    .fetch_one(&state.db)
    .await?;

    // The cached snapshot is good enough for a dashboard tile; the streak
    // endpoint recomputes from the logs.
    let snapshot = sqlx::query_as::<_, (i32, i32)>(
        "SELECT current_streak, longest_streak FROM streaks WHERE user_id = $1",
    )
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?;

    let recent_logs = sqlx::query_as::<_, ReadingLog>(
        r#"
        SELECT * FROM reading_logs
        WHERE user_id = $1
        ORDER BY log_date DESC
        LIMIT 7
        "#,
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(DashboardResponse {
        books_reading: count_for(&BookStatus::Reading),
        books_finished: count_for(&BookStatus::Finished),
        books_want_to_read: count_for(&BookStatus::WantToRead),
        pages_last_7_days,
        pages_last_30_days,
        current_streak: snapshot.map(|(current, _)| current),
        longest_streak: snapshot.map(|(_, longest)| longest),
        recent_logs,
    }))
}
