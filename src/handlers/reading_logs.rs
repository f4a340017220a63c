use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::reading_log::{
    CorrectLogRequest, LogRangeQuery, ReadingLog, RecordSessionRequest,
};
use crate::services::clock;
use crate::AppState;

/// Take the per-user streak row lock before mutating logs. Freeze consumption
/// decides "does this day already qualify" under the same lock, so a session
/// write and a freeze spend for the same user never interleave. No-op for
/// users who have not configured a goal yet.
async fn lock_streak_state(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> AppResult<()> {
    sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM streaks WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn user_today(db: &sqlx::PgPool, user_id: Uuid) -> AppResult<NaiveDate> {
    let timezone = sqlx::query_scalar::<_, String>("SELECT timezone FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    Ok(clock::today_for(&timezone, Utc::now()))
}

/// Record a reading session. Pages accumulate onto the day's existing row;
/// one row per user per calendar day.
pub async fn record_session(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<RecordSessionRequest>,
) -> AppResult<Json<ReadingLog>> {
    super::validate(&body)?;

    let today = user_today(&state.db, auth_user.id).await?;
    let log_date = body.log_date.unwrap_or(today);
    if log_date > today {
        return Err(AppError::Validation(
            "log_date cannot be in the future".into(),
        ));
    }

    if let Some(book_id) = body.book_id {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(auth_user.id)
            .fetch_optional(&state.db)
            .await?
            .ok_or(AppError::NotFound("Book not found".into()))?;
    }

    let mut tx = state.db.begin().await?;
    lock_streak_state(&mut tx, auth_user.id).await?;

    let log = sqlx::query_as::<_, ReadingLog>(
        r#"
        INSERT INTO reading_logs (id, user_id, log_date, pages_read, book_id)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, log_date) DO UPDATE SET
            pages_read = reading_logs.pages_read + EXCLUDED.pages_read,
            book_id = COALESCE(EXCLUDED.book_id, reading_logs.book_id),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(log_date)
    .bind(body.pages_read)
    .bind(body.book_id)
    .fetch_one(&mut *tx)
    .await?;

    // Advance the book's bookmark along with the session.
    if let Some(book_id) = body.book_id {
        sqlx::query(
            r#"
            UPDATE books SET
                current_page = LEAST(
                    current_page + $3,
                    COALESCE(total_pages, current_page + $3)
                ),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(book_id)
        .bind(auth_user.id)
        .bind(body.pages_read)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Json(log))
}

/// Retroactively correct a day's total. The next streak read recomputes from
/// the logs, so the correction takes effect without any cache invalidation.
pub async fn correct_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_date): Path<NaiveDate>,
    Json(body): Json<CorrectLogRequest>,
) -> AppResult<Json<ReadingLog>> {
    super::validate(&body)?;

    let today = user_today(&state.db, auth_user.id).await?;
    if log_date > today {
        return Err(AppError::Validation(
            "log_date cannot be in the future".into(),
        ));
    }

    if let Some(book_id) = body.book_id {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(auth_user.id)
            .fetch_optional(&state.db)
            .await?
            .ok_or(AppError::NotFound("Book not found".into()))?;
    }

    let mut tx = state.db.begin().await?;
    lock_streak_state(&mut tx, auth_user.id).await?;

    let log = sqlx::query_as::<_, ReadingLog>(
        r#"
        INSERT INTO reading_logs (id, user_id, log_date, pages_read, book_id)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, log_date) DO UPDATE SET
            pages_read = EXCLUDED.pages_read,
            book_id = COALESCE(EXCLUDED.book_id, reading_logs.book_id),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(log_date)
    .bind(body.pages_read)
    .bind(body.book_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(log))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<LogRangeQuery>,
) -> AppResult<Json<Vec<ReadingLog>>> {
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = query.start_date.unwrap_or(end - Duration::days(30));

    let logs = sqlx::query_as::<_, ReadingLog>(
        r#"
        SELECT * FROM reading_logs
        WHERE user_id = $1 AND log_date BETWEEN $2 AND $3
        ORDER BY log_date DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(logs))
}
