use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::quote::{CreateQuoteRequest, Quote};
use crate::AppState;

pub async fn list_quotes(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Vec<Quote>>> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE id = $1 AND user_id = $2")
        .bind(book_id)
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Book not found".into()))?;

    let quotes = sqlx::query_as::<_, Quote>(
        "SELECT * FROM quotes WHERE book_id = $1 ORDER BY created_at DESC",
    )
    .bind(book_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(quotes))
}

pub async fn create_quote(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(book_id): Path<Uuid>,
    Json(body): Json<CreateQuoteRequest>,
) -> AppResult<Json<Quote>> {
    super::validate(&body)?;

    sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE id = $1 AND user_id = $2")
        .bind(book_id)
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Book not found".into()))?;

    let quote = sqlx::query_as::<_, Quote>(
        r#"
        INSERT INTO quotes (id, user_id, book_id, content, page)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(book_id)
    .bind(&body.content)
    .bind(body.page)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(quote))
}

pub async fn delete_quote(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(quote_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM quotes WHERE id = $1 AND user_id = $2")
        .bind(quote_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quote not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
