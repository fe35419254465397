// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} does not exist")]
    MissingParent(&'static str),

    #[error("{0} already exists")]
    AlreadyExists(&'static str),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Already voted")]
    AlreadyVoted,

    #[error("missing or invalid user session")]
    Unauthorized,

    #[error("only the poll creator may do that")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyVoted => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::MissingParent(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::Database(e)) => {
                error!("store failure: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
