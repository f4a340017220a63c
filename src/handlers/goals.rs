use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::streak::{GoalPreferences, UpsertGoalRequest};
use crate::AppState;

pub async fn get_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<GoalPreferences>> {
    let prefs = sqlx::query_as::<_, GoalPreferences>(
        "SELECT * FROM goal_preferences WHERE user_id = $1",
    )
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Reading goal not configured".into()))?;

    Ok(Json(prefs))
}

pub async fn upsert_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertGoalRequest>,
) -> AppResult<Json<GoalPreferences>> {
    super::validate(&body)?;

    let freeze_allowance = body
        .freeze_allowance
        .unwrap_or(state.config.default_freeze_allowance);

    let mut tx = state.db.begin().await?;

    let prefs = sqlx::query_as::<_, GoalPreferences>(
        r#"
        INSERT INTO goal_preferences (user_id, daily_page_goal, freeze_allowance)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET
            daily_page_goal = $2,
            freeze_allowance = $3,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(auth_user.id)
    .bind(body.daily_page_goal)
    .bind(freeze_allowance)
    .fetch_one(&mut *tx)
    .await?;

    // First configuration seeds the freeze ledger at the full allowance.
    // Later goal edits never touch an existing ledger.
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

    tx.commit().await?;

    Ok(Json(prefs))
}
