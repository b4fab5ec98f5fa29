//! Authentication endpoints
//!
//! Signup, login, logout and the current session. The session is the single
//! `currentUser` pointer held by the shared storage, not a per-client token.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use taskdesk_core::user::{NewUser, PublicUser};

use super::{from_core, route_error, RouteError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub user: NewUser,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), RouteError> {
    req.user.validate().map_err(from_core)?;
    if let Some(confirm) = &req.confirm_password {
        if *confirm != req.user.password {
            return Err(route_error(
                StatusCode::BAD_REQUEST,
                "Passwords do not match",
            ));
        }
    }

    tokio::time::sleep(state.auth_delay()).await;
    let user = state
        .ctx()
        .users()
        .register(req.user)
        .await
        .map_err(from_core)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user,
        }),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, RouteError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(route_error(
            StatusCode::BAD_REQUEST,
            "Please enter both username and password",
        ));
    }

    tokio::time::sleep(state.auth_delay()).await;
    let user = state
        .ctx()
        .users()
        .login(&req.username, &req.password)
        .await
        .map_err(from_core)?;

    Ok(Json(AuthResponse {
        success: true,
        user,
    }))
}

/// POST /api/auth/logout
async fn logout(State(state): State<AppState>) -> Result<Json<LogoutResponse>, RouteError> {
    state.ctx().users().logout().await.map_err(from_core)?;
    Ok(Json(LogoutResponse { success: true }))
}

/// GET /api/auth/me
async fn me(State(state): State<AppState>) -> Result<Json<SessionResponse>, RouteError> {
    let user = state.ctx().users().current_user().await.map_err(from_core)?;
    Ok(Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}
