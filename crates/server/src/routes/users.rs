//! User profile endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskdesk_core::user::{is_valid_email, PublicUser, Theme, User, UserPatch, UserSummary};
use taskdesk_core::UserId;

use super::{from_core, parse_user_id, route_error, RouteError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

/// Profile editor view of a user record. The password never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub avatar_color: Option<String>,
    pub theme: Option<Theme>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email,
            avatar_color: user.avatar_color,
            theme: user.theme,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: PublicUser,
}

/// Profile form checks for the fields present in `patch`
fn validate_patch(patch: &UserPatch) -> Result<(), RouteError> {
    let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&patch.name) {
        return Err(route_error(StatusCode::BAD_REQUEST, "Name is required"));
    }
    if blank(&patch.username) {
        return Err(route_error(StatusCode::BAD_REQUEST, "Username is required"));
    }
    if blank(&patch.email) {
        return Err(route_error(StatusCode::BAD_REQUEST, "Email is required"));
    }
    if let Some(email) = &patch.email {
        if !is_valid_email(email) {
            return Err(route_error(
                StatusCode::BAD_REQUEST,
                "Please enter a valid email",
            ));
        }
    }
    Ok(())
}

/// Only the logged-in user may read or edit their own record
async fn require_session_user(state: &AppState, id: UserId) -> Result<(), RouteError> {
    let current = state.ctx().users().current_user().await.map_err(from_core)?;
    match current {
        Some(user) if user.id == id => Ok(()),
        Some(_) => Err(route_error(
            StatusCode::FORBIDDEN,
            "Cannot access another user's profile",
        )),
        None => Err(route_error(StatusCode::UNAUTHORIZED, "Not logged in")),
    }
}

/// GET /api/users
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, RouteError> {
    let users = state.ctx().users().all_users().await.map_err(from_core)?;
    Ok(Json(users))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, RouteError> {
    let id = parse_user_id(&id)?;
    require_session_user(&state, id).await?;

    let user = state
        .ctx()
        .users()
        .get_user_details(id)
        .await
        .map_err(from_core)?;
    user.map(|user| Json(ProfileResponse::from(user)))
        .ok_or_else(|| route_error(StatusCode::NOT_FOUND, "User not found"))
}

/// PATCH /api/users/{id}
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserResponse>, RouteError> {
    let id = parse_user_id(&id)?;
    require_session_user(&state, id).await?;
    validate_patch(&patch)?;

    let user = state
        .ctx()
        .users()
        .update_user(id, patch)
        .await
        .map_err(from_core)?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

/// POST /api/users/{id}/password
async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<UserResponse>, RouteError> {
    let id = parse_user_id(&id)?;
    require_session_user(&state, id).await?;

    if req.current_password.is_empty() {
        return Err(route_error(
            StatusCode::BAD_REQUEST,
            "Please enter your current password",
        ));
    }
    if let Some(confirm) = &req.confirm_password {
        if *confirm != req.new_password {
            return Err(route_error(
                StatusCode::BAD_REQUEST,
                "New passwords do not match",
            ));
        }
    }

    let user = state
        .ctx()
        .users()
        .change_password(id, &req.current_password, &req.new_password)
        .await
        .map_err(from_core)?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user).patch(update_user))
        .route("/api/users/{id}/password", post(change_password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        response::Response,
    };
    use serde_json::{json, Value};
    use taskdesk_core::events::Notification;
    use tower::ServiceExt;

    async fn logged_in(username: &str) -> AppState {
        let state = AppState::for_tests().await;
        state
            .ctx()
            .users()
            .login(username, username)
            .await
            .unwrap();
        state
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        router()
            .with_state(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn list_users_hides_passwords() {
        let state = AppState::for_tests().await;
        let response = send(&state, "GET", "/api/users", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let payload = read_json(response).await;
        let users = payload.as_array().unwrap();
        assert_eq!(users.len(), 3);
        assert!(users.iter().all(|u| u.get("password").is_none()));
        assert_eq!(users[0]["avatarColor"], "#6366f1");
    }

    #[tokio::test]
    async fn get_user_is_limited_to_session_user() {
        let state = logged_in("Gnanesh").await;

        let response = send(&state, "GET", "/api/users/1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["email"], "gnanesh@example.com");
        assert_eq!(payload["username"], "Gnanesh");
        assert!(payload.get("password").is_none());

        let response = send(&state, "GET", "/api/users/2", None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&state, "GET", "/api/users/abc", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_profile_refreshes_session_and_notifies() {
        let state = logged_in("Ashika").await;
        let mut rx = state.ctx().events().subscribe();

        let response = send(
            &state,
            "PATCH",
            "/api/users/2",
            Some(json!({ "name": "Ashika R", "theme": "dark" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["user"]["name"], "Ashika R");
        assert_eq!(payload["user"]["theme"], "dark");

        let session = state.ctx().users().current_user().await.unwrap().unwrap();
        assert_eq!(session.name, "Ashika R");
        let mut received = Vec::new();
        while let Ok(notification) = rx.try_recv() {
            received.push(notification);
        }
        assert!(received
            .iter()
            .any(|n| matches!(n, Notification::ProfileUpdated(user) if user.name == "Ashika R")));
    }

    #[tokio::test]
    async fn update_profile_rejects_taken_email_and_blank_name() {
        let state = logged_in("Ashika").await;

        let response = send(
            &state,
            "PATCH",
            "/api/users/2",
            Some(json!({ "email": "GNANESH@example.com" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(&state, "PATCH", "/api/users/2", Some(json!({ "name": "  " }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json(response).await;
        assert_eq!(payload["message"], "Name is required");
    }

    #[tokio::test]
    async fn change_password_checks_current_password() {
        let state = logged_in("Ashesh").await;

        let response = send(
            &state,
            "POST",
            "/api/users/3/password",
            Some(json!({ "currentPassword": "wrong", "newPassword": "fresh" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json(response).await;
        assert_eq!(payload["message"], "Current password is incorrect");

        let response = send(
            &state,
            "POST",
            "/api/users/3/password",
            Some(json!({
                "currentPassword": "Ashesh",
                "newPassword": "fresh",
                "confirmPassword": "fresh"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.ctx().users().login("Ashesh", "fresh").await.is_ok());
    }
}
