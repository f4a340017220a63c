use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::note::{CreateNoteRequest, Note, UpdateNoteRequest};
use crate::AppState;

async fn verify_book_ownership(
    db: &sqlx::PgPool,
    book_id: Uuid,
    user_id: Uuid,
) -> AppResult<()> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE id = $1 AND user_id = $2")
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Book not found".into()))?;
    Ok(())
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Vec<Note>>> {
    verify_book_ownership(&state.db, book_id, auth_user.id).await?;

    let notes = sqlx::query_as::<_, Note>(
        "SELECT * FROM notes WHERE book_id = $1 ORDER BY created_at DESC",
    )
    .bind(book_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(book_id): Path<Uuid>,
    Json(body): Json<CreateNoteRequest>,
) -> AppResult<Json<Note>> {
    super::validate(&body)?;
    verify_book_ownership(&state.db, book_id, auth_user.id).await?;

    let note = sqlx::query_as::<_, Note>(
        r#"
        INSERT INTO notes (id, user_id, book_id, content, page)
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

    Ok(Json(note))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(note_id): Path<Uuid>,
    Json(body): Json<UpdateNoteRequest>,
) -> AppResult<Json<Note>> {
    super::validate(&body)?;

    let note = sqlx::query_as::<_, Note>(
        r#"
        UPDATE notes SET
            content = COALESCE($3, content),
            page = COALESCE($4, page),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(note_id)
    .bind(auth_user.id)
    .bind(&body.content)
    .bind(body.page)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Note not found".into()))?;

    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(note_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
        .bind(note_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Note not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
