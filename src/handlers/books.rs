use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::book::{Book, BookListQuery, BookStatus, CreateBookRequest, UpdateBookRequest};
use crate::AppState;

pub async fn list_books(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<BookListQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = if let Some(status) = query.status {
        sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE user_id = $1 AND status = $2
            ORDER BY updated_at DESC
            "#,
        )
        .bind(auth_user.id)
        .bind(status)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, Book>(
            "SELECT * FROM books WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(auth_user.id)
        .fetch_all(&state.db)
        .await?
    };

    Ok(Json(books))
}

pub async fn get_book(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Book>> {
    let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 AND user_id = $2")
        .bind(book_id)
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Book not found".into()))?;

    Ok(Json(book))
}

pub async fn create_book(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateBookRequest>,
) -> AppResult<Json<Book>> {
    super::validate(&body)?;

    let book = sqlx::query_as::<_, Book>(
        r#"
        INSERT INTO books (id, user_id, title, author, status, total_pages)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(&body.title)
    .bind(&body.author)
    .bind(body.status.unwrap_or_default())
    .bind(body.total_pages)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(book))
}

pub async fn update_book(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(book_id): Path<Uuid>,
    Json(body): Json<UpdateBookRequest>,
) -> AppResult<Json<Book>> {
    super::validate(&body)?;

    let existing = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 AND user_id = $2")
        .bind(book_id)
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Book not found".into()))?;

    // Moving into `finished` stamps finished_at unless the caller set one.
    let finished_at = match (&body.status, body.finished_at) {
        (Some(BookStatus::Finished), None) if existing.finished_at.is_none() => {
            Some(chrono::Utc::now().date_naive())
        }
        (_, explicit) => explicit,
    };

    let book = sqlx::query_as::<_, Book>(
        r#"
        UPDATE books SET
            title = COALESCE($3, title),
            author = COALESCE($4, author),
            status = COALESCE($5, status),
            total_pages = COALESCE($6, total_pages),
            current_page = COALESCE($7, current_page),
            rating = COALESCE($8, rating),
            started_at = COALESCE($9, started_at),
            finished_at = COALESCE($10, finished_at),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(book_id)
    .bind(auth_user.id)
    .bind(&body.title)
    .bind(&body.author)
    .bind(&body.status)
    .bind(body.total_pages)
    .bind(body.current_page)
    .bind(body.rating)
    .bind(body.started_at)
    .bind(finished_at)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(book))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM books WHERE id = $1 AND user_id = $2")
        .bind(book_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Book not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
