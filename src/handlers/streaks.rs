use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Duration, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::reading_logs::user_today;
use crate::models::streak::{
    CalendarQuery, GoalPreferences, StreakResponse, StreakRow, UseFreezeRequest,
};
use crate::services::streak::{CalendarDay, Computation, History};
use crate::AppState;

const MAX_CALENDAR_DAYS: i64 = 400;

async fn load_prefs(
    conn: &mut sqlx::PgConnection,
    user_id: Uuid,
) -> AppResult<GoalPreferences> {
    sqlx::query_as::<_, GoalPreferences>("SELECT * FROM goal_preferences WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or(AppError::NotFound("Reading goal not configured".into()))
}

/// Load the user's full log history and freeze ledger into the engine's
/// in-memory form. Callers run this inside a transaction so both tables are
/// read from one consistent snapshot.
async fn load_history(
    conn: &mut sqlx::PgConnection,
    user_id: Uuid,
    daily_page_goal: i32,
) -> AppResult<History> {
    let logs = sqlx::query_as::<_, (NaiveDate, i32)>(
        "SELECT log_date, pages_read FROM reading_logs WHERE user_id = $1 ORDER BY log_date",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let frozen = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT covered_date FROM streak_freezes WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    History::new(daily_page_goal, logs, frozen).map_err(|date| {
        AppError::InvalidState(format!("duplicate reading log rows for {date}"))
    })
}

fn report_excluded(user_id: Uuid, computation: &Computation) {
    if !computation.excluded.is_empty() {
        tracing::warn!(
            user_id = %user_id,
            dates = ?computation.excluded,
            "Future-dated reading logs excluded from streak computation"
        );
    }
}

pub async fn get_streak(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<StreakResponse>> {
    let today = user_today(&state.db, auth_user.id).await?;

    let mut tx = state.db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await?;
    let prefs = load_prefs(&mut *tx, auth_user.id).await?;
    let history = load_history(&mut *tx, auth_user.id, prefs.daily_page_goal).await?;
    tx.commit().await?;

    let computation = history.compute(today);
    report_excluded(auth_user.id, &computation);

    // Refresh the display snapshot. The computed columns are overwritten on
    // every read; the freeze ledger is only ever changed under the row lock
    // in use_freeze, so this upsert leaves it alone.
    let row = sqlx::query_as::<_, StreakRow>(
        r#"
        INSERT INTO streaks (user_id, current_streak, longest_streak, freezes_available, last_computed_date)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE SET
            current_streak = $2,
            longest_streak = GREATEST(streaks.longest_streak, $3),
            last_computed_date = $5,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(auth_user.id)
    .bind(computation.current_streak)
    .bind(computation.longest_streak)
    .bind(prefs.freeze_allowance)
    .bind(today)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(StreakResponse {
        current_streak: computation.current_streak,
        longest_streak: row.longest_streak,
        freezes_available: row.freezes_available,
        freezes_used: row.freezes_used,
        as_of: today,
    }))
}

pub async fn get_calendar(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<Vec<CalendarDay>>> {
    if query.start_date > query.end_date {
        return Err(AppError::Validation(
            "start_date must not be after end_date".into(),
        ));
    }
    if (query.end_date - query.start_date).num_days() > MAX_CALENDAR_DAYS {
        return Err(AppError::Validation(format!(
            "date range is limited to {MAX_CALENDAR_DAYS} days"
        )));
    }

    let today = user_today(&state.db, auth_user.id).await?;

    let mut tx = state.db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await?;
    let prefs = load_prefs(&mut *tx, auth_user.id).await?;
    let history = load_history(&mut *tx, auth_user.id, prefs.daily_page_goal).await?;
    tx.commit().await?;

    Ok(Json(history.project_calendar(
        today,
        query.start_date,
        query.end_date,
    )))
}

/// Spend one freeze to cover `target_date`. The user's streaks row is locked
/// for the whole check-and-update, so concurrent attempts serialize: the
/// winner spends the freeze, the rest observe its effects and fail one of the
/// preconditions. All failures leave the ledger untouched.
pub async fn use_freeze(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UseFreezeRequest>,
) -> AppResult<Json<StreakResponse>> {
    let today = user_today(&state.db, auth_user.id).await?;

    let mut tx = state.db.begin().await?;

    let prefs = load_prefs(&mut *tx, auth_user.id).await?;

    sqlx::query(
        r#"
        INSERT INTO streaks (user_id, freezes_available)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(auth_user.id)
    .bind(prefs.freeze_allowance)
    .execute(&mut *tx)
    .await?;

    let ledger = sqlx::query_as::<_, StreakRow>(
        "SELECT * FROM streaks WHERE user_id = $1 FOR UPDATE",
    )
    .bind(auth_user.id)
    .fetch_one(&mut *tx)
    .await?;

    let history = load_history(&mut *tx, auth_user.id, prefs.daily_page_goal).await?;
    history.check_freeze(today, body.target_date, ledger.freezes_available)?;

    sqlx::query(
        r#"
        INSERT INTO streak_freezes (id, user_id, covered_date)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.target_date)
    .execute(&mut *tx)
    .await?;

    let computation = history.with_freeze(body.target_date).compute(today);
    report_excluded(auth_user.id, &computation);

    let row = sqlx::query_as::<_, StreakRow>(
        r#"
        UPDATE streaks SET
            current_streak = $2,
            longest_streak = GREATEST(longest_streak, $3),
            freezes_available = freezes_available - 1,
            freezes_used = freezes_used + 1,
            last_computed_date = $4,
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(auth_user.id)
    .bind(computation.current_streak)
    .bind(computation.longest_streak)
    .bind(today)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %auth_user.id,
        covered_date = %body.target_date,
        current_streak = computation.current_streak,
        "Freeze consumed"
    );

    Ok(Json(StreakResponse {
        current_streak: row.current_streak,
        longest_streak: row.longest_streak,
        freezes_available: row.freezes_available,
        freezes_used: row.freezes_used,
        as_of: today,
    }))
}

/// Periodic freeze replenishment: users whose last grant is at least the
/// configured interval old gain `freeze_grant_amount`, capped at their
/// allowance.
pub fn spawn_freeze_grant_worker(db: PgPool, config: Arc<Config>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;

            let due = chrono::Utc::now() - Duration::days(config.freeze_grant_interval_days);
            let result = sqlx::query(
                r#"
                UPDATE streaks s SET
                    freezes_available = LEAST(s.freezes_available + $1, g.freeze_allowance),
                    last_grant_at = NOW(),
                    updated_at = NOW()
                FROM goal_preferences g
                WHERE g.user_id = s.user_id AND s.last_grant_at <= $2
                "#,
            )
            .bind(config.freeze_grant_amount)
            .bind(due)
            .execute(&db)
            .await;

            match result {
                Ok(r) => tracing::info!(users = r.rows_affected(), "Freeze grant sweep complete"),
                Err(e) => tracing::error!(error = %e, "Freeze grant sweep failed"),
            }
        }
    });
}
