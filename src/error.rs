use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// Slot taken, no free host, or a duplicate record.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Plan limit reached: {0}")]
    LimitReached(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

// 2067 = SQLite unique constraint, 23505 = PostgreSQL unique violation
const UNIQUE_VIOLATION_CODES: [&str; 2] = ["2067", "23505"];

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| UNIQUE_VIOLATION_CODES.contains(&&*code))
}

impl AppError {
    /// Stable machine-readable class, so clients can tell "pick another
    /// time" from "fix your input".
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(e) if is_unique_violation(e) => "conflict",
            AppError::Database(_) | AppError::Internal | AppError::InternalWithMsg(_) => "internal",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::LimitReached(_) => "limit_reached",
            AppError::Validation(_) => "validation",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Database(e) if is_unique_violation(e) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal | AppError::InternalWithMsg(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::LimitReached(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) if is_unique_violation(e) => "Resource already exists (duplicate entry)".to_string(),
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                "Internal error".to_string()
            }
            AppError::Internal => "Internal error".to_string(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::LimitReached(msg)
            | AppError::Validation(msg) => msg.clone(),
        };

        let mut body = json!({
            "error": message,
            "code": self.code(),
        });
        if matches!(self, AppError::LimitReached(_)) {
            body["upgrade_required"] = json!(true);
        }

        (status, Json(body)).into_response()
    }
}
