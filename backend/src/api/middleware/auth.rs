//! Authentication middleware.
//!
//! Requires `Authorization: Bearer <jwt>` and records the caller in the
//! request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::services::auth_service::{AuthService, Claims};

/// Extension that holds authenticated user information
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub username: String,
}

impl From<Claims> for AuthExtension {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
        }
    }
}

/// Token extraction result
#[derive(Debug, PartialEq, Eq)]
enum ExtractedToken<'a> {
    Bearer(&'a str),
    None,
    Invalid,
}

fn extract_token(request: &Request) -> ExtractedToken<'_> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return ExtractedToken::None;
    };
    match header.to_str().ok().and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.trim().is_empty() => ExtractedToken::Bearer(token.trim()),
        _ => ExtractedToken::Invalid,
    }
}

/// Authentication middleware function - requires valid token
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_token(&request) {
        ExtractedToken::Bearer(token) => match auth_service.validate_access_token(token) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthExtension::from(claims));
                next.run(request).await
            }
            Err(_) => {
                AppError::Authentication("Invalid or expired token".into()).into_response()
            }
        },
        ExtractedToken::None => {
            AppError::Authentication("Missing authorization header".into()).into_response()
        }
        ExtractedToken::Invalid => {
            AppError::Authentication("Invalid authorization header format".into()).into_response()
        }
    }
}
