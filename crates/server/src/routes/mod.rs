//! Route handlers

pub mod auth;
pub mod events;
pub mod health;
pub mod tasks;
pub mod users;

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;
use taskdesk_core::{Error, UserId};

use crate::state::AppState;

/// Body of every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

pub fn route_error(status: StatusCode, message: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
        }),
    )
}

/// Map a core failure onto a status code and user-facing message
pub fn from_core(err: Error) -> RouteError {
    let status = match &err {
        Error::DuplicateUsername | Error::DuplicateEmail => StatusCode::CONFLICT,
        Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
        Error::UserNotFound(_) | Error::TaskNotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidFormat(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Serialization(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    route_error(status, err.user_message())
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, RouteError> {
    raw.parse::<UserId>().map_err(from_core)
}

/// Full REST surface
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(tasks::router())
        .merge(events::router())
        .with_state(state)
}
