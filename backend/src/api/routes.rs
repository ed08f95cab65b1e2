//! Route definitions for the API.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use super::middleware::auth::auth_middleware;
use super::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use super::middleware::security_headers::security_headers_middleware;
use super::middleware::tracing::correlation_id_middleware;
use super::SharedState;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    // Build OpenAPI spec once at startup
    let openapi = super::openapi::build_openapi();

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", openapi))
        .nest("/api/v1", api_v1_routes(state.clone()))
        // Uploads are whole document batches; axum's 2 MB default would
        // reject ordinary scans.
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(correlation_id_middleware))
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: SharedState) -> Router<SharedState> {
    let auth_service = state.auth_service.clone();
    let login_rate_limiter = Arc::new(RateLimiter::new(
        state.config.login_rate_limit_per_minute,
        60,
    ));

    Router::new()
        .nest(
            "/auth",
            handlers::auth::public_router().layer(middleware::from_fn_with_state(
                login_rate_limiter,
                rate_limit_middleware,
            )),
        )
        .nest(
            "/auth",
            handlers::auth::protected_router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/merges",
            handlers::merges::router().layer(middleware::from_fn_with_state(
                auth_service,
                auth_middleware,
            )),
        )
        // Triggered by cron without credentials
        .nest("/cleanup", handlers::cleanup::router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_state::{test_app, TestApp};
    use crate::services::test_support::{page_widths, pdf_with_pages, png_bytes};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "evidence-test-boundary";

    enum Part<'a> {
        File(&'a str, Vec<u8>),
        Text(&'a str, &'a str),
    }

    fn multipart_body(parts: Vec<Part<'_>>) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File(filename, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                            filename
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&bytes);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value)
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn send(app: &TestApp, request: Request<Body>) -> Response {
        create_router(app.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &TestApp) -> String {
        let request = Request::post("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"username": "admin", "password": "password"}).to_string(),
            ))
            .unwrap();
        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn merge_request(token: &str, parts: Vec<Part<'_>>) -> Request<Body> {
        Request::post("/api/v1/merges")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_merge_routes_require_token() {
        let app = test_app();
        let response = send(
            &app,
            Request::get("/api/v1/merges").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "AUTH_ERROR");
    }

    #[tokio::test]
    async fn test_bad_login_is_rejected() {
        let app = test_app();
        let request = Request::post("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"username": "admin", "password": "not-it"}).to_string(),
            ))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("X-RateLimit-Remaining"));
    }

    #[tokio::test]
    async fn test_me_returns_identity() {
        let app = test_app();
        let token = login(&app).await;
        let request = Request::get("/api/v1/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["username"], "admin");
    }

    #[tokio::test]
    async fn test_merge_then_download() {
        let app = test_app();
        let token = login(&app).await;

        let response = send(
            &app,
            merge_request(
                &token,
                vec![
                    Part::File("photo.png", png_bytes(500, 300)),
                    Part::File("report.pdf", pdf_with_pages(2)),
                    Part::File("notes.txt", b"skip me".to_vec()),
                    Part::Text("team_id", "42"),
                    Part::Text("ticket_id", "1001"),
                ],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("X-Correlation-ID"));

        let body = json_body(response).await;
        let filename = body["filename"].as_str().unwrap().to_string();
        assert!(filename.starts_with("User 42 - Evidence "));
        assert_eq!(body["page_count"], 3);
        assert_eq!(body["skipped_files"][0]["filename"], "notes.txt");

        let download = Request::get(body["download_url"].as_str().unwrap())
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = send(&app, download).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(&filename));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(page_widths(&bytes), vec![500, 612, 612]);

        let rows = app.ledger.files();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].download_count, 1);
        assert_eq!(rows[0].salesforce_ticket, "1001");
        assert_eq!(app.ledger.logs().len(), 1);

        let listing = Request::get("/api/v1/merges?page=1")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let body = json_body(send(&app, listing).await).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["pagination"]["per_page"], 25);
        assert_eq!(body["items"][0]["filename"], filename.as_str());
        assert_eq!(body["items"][0]["downloads"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_merge_with_non_numeric_team_is_rejected() {
        let app = test_app();
        let token = login(&app).await;
        let response = send(
            &app,
            merge_request(
                &token,
                vec![
                    Part::File("report.pdf", pdf_with_pages(1)),
                    Part::Text("team_id", "blue"),
                    Part::Text("ticket_id", "1001"),
                ],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");
        assert!(app.ledger.files().is_empty());
    }

    #[tokio::test]
    async fn test_merge_without_valid_files() {
        let app = test_app();
        let token = login(&app).await;
        let response = send(
            &app,
            merge_request(
                &token,
                vec![
                    Part::File("virus.exe", b"MZ".to_vec()),
                    Part::Text("team_id", "42"),
                    Part::Text("ticket_id", "1001"),
                ],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "NO_VALID_FILES");
        assert_eq!(body["message"], "No valid files to process!");
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let app = test_app();
        let token = login(&app).await;
        let request = Request::get("/api/v1/merges/download/User%201%20-%20Evidence%202020-01-01.pdf")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(app.ledger.logs().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_is_public() {
        let app = test_app();
        std::fs::write(app.dir.path().join("fresh.pdf"), b"%PDF").unwrap();

        let response = send(
            &app,
            Request::post("/api/v1/cleanup").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "Cleanup completed");
        assert_eq!(body["scanned"], 1);
        assert!(body["deleted"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let app = test_app();
        let response = send(
            &app,
            Request::get("/api/v1/openapi.json").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["info"]["title"],
            "Evidence Binder API"
        );
    }
}
