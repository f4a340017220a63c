use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub content: String,
    pub page: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    #[validate(length(min = 1, max = 5000, message = "Quote must be 1-5000 characters"))]
    pub content: String,

    #[validate(range(min = 1))]
    pub page: Option<i32>,
}
