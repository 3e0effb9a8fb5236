//! API response bodies
//!
//! Every body carries `status`: `SUCCESS` or `ERROR`. Errors add an
//! `errorCode` and a human-readable `message`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::ServerError;
use crate::error::handlers::{error_to_code, error_to_message, error_to_status, handle_error};

pub const SUCCESS: &str = "SUCCESS";
pub const ERROR: &str = "ERROR";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub status: &'static str,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub status: &'static str,
    pub users: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error_code: String,
    pub message: String,
}

impl UserResponse {
    pub fn new(user_id: String) -> Self {
        Self {
            status: SUCCESS,
            user_id,
        }
    }
}

impl UsersResponse {
    pub fn new(users: Vec<String>) -> Self {
        Self {
            status: SUCCESS,
            users,
        }
    }
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: SUCCESS,
            message: message.into(),
        }
    }
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ERROR,
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

/// A failed request, rendered as an `ErrorResponse`.
#[derive(Debug)]
pub struct ApiError(pub ServerError);

impl<E> From<E> for ApiError
where
    E: Into<ServerError>,
{
    fn from(error: E) -> Self {
        ApiError(error.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        handle_error(&self.0);

        let status = StatusCode::from_u16(error_to_status(&self.0))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::new(error_to_code(&self.0), error_to_message(&self.0));

        (status, Json(body)).into_response()
    }
}
