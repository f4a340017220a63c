use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub status: BookStatus,
    pub total_pages: Option<i32>,
    pub current_page: i32,
    pub rating: Option<i16>,
    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq)]
#[sqlx(type_name = "book_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    WantToRead,
    Reading,
    Finished,
}

impl Default for BookStatus {
    fn default() -> Self {
        Self::WantToRead
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookRequest {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: String,

    #[validate(length(max = 500, message = "Author too long"))]
    pub author: Option<String>,

    pub status: Option<BookStatus>,

    #[validate(range(min = 1, message = "total_pages must be positive"))]
    pub total_pages: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,

    #[validate(length(max = 500))]
    pub author: Option<String>,

    pub status: Option<BookStatus>,

    #[validate(range(min = 1))]
    pub total_pages: Option<i32>,

    #[validate(range(min = 0))]
    pub current_page: Option<i32>,

    #[validate(range(min = 1, max = 5, message = "Rating must be 1-5"))]
    pub rating: Option<i16>,

    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct BookListQuery {
    pub status: Option<BookStatus>,
}
