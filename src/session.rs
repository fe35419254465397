// src/session.rs
//! The signed-in user behind a request.
//!
//! Sign-in and sign-out happen at the identity provider. Requests reach us
//! with the confirmed user in `x-user-id` (and `x-user-email` when known);
//! a request without them has no session.
use axum::{extract::FromRequestParts, http::request::Parts};
use http::HeaderMap;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl Session {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = headers
            .get(USER_ID_HEADER)?
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())?;

        let email = headers
            .get(USER_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Some(Self { user_id, email })
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Session::from_headers(&parts.headers).ok_or(AppError::Unauthorized)
    }
}
