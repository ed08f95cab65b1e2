//! Authentication handlers.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;

#[derive(OpenApi)]
#[openapi(
    paths(login, logout, get_current_user),
    components(schemas(LoginRequest, LoginResponse, UserResponse))
)]
pub struct AuthApiDoc;

/// Create public auth routes (no auth required)
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Create protected auth routes (auth required)
pub fn protected_router() -> Router<SharedState> {
    Router::new().route("/me", get(get_current_user))
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

redacted_debug!(LoginRequest {
    show username,
    redact password,
});

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub username: String,
}

/// Login with the administrator credentials
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 400, description = "Username or password length out of range", body = crate::api::openapi::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::openapi::ErrorResponse),
        (status = 429, description = "Too many login attempts", body = crate::api::openapi::ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let token = state
        .auth_service
        .authenticate(&payload.username, &payload.password)?;

    Ok(Json(LoginResponse {
        access_token: token.token,
        expires_in: token.expires_in,
        token_type: "Bearer".to_string(),
    }))
}

/// Logout current session
#[utoipa::path(
    post,
    path = "/logout",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses((status = 204, description = "Logged out"))
)]
pub async fn logout() -> StatusCode {
    // Tokens are stateless; the client discards its copy.
    StatusCode::NO_CONTENT
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/me",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated identity", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(Extension(auth): Extension<AuthExtension>) -> Json<UserResponse> {
    Json(UserResponse {
        username: auth.username,
    })
}
