use validator::Validate;

use crate::error::{AppError, AppResult};

pub mod auth;
pub mod books;
pub mod dashboard;
pub mod goals;
pub mod health;
pub mod notes;
pub mod quotes;
pub mod reading_logs;
pub mod streaks;

pub(crate) fn validate(body: &impl Validate) -> AppResult<()> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}
