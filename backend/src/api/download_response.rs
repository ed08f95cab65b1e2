//! Attachment responses for merged artifacts.

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

/// Bytes served as a file download.
pub struct DownloadResponse {
    pub data: Bytes,
    pub content_type: &'static str,
    pub filename: String,
}

impl DownloadResponse {
    pub fn pdf(data: Bytes, filename: impl Into<String>) -> Self {
        Self {
            data,
            content_type: "application/pdf",
            filename: filename.into(),
        }
    }
}

/// `Content-Disposition` value; falls back to a bare `attachment` when the
/// name cannot be carried in a header.
pub fn attachment_disposition(filename: &str) -> HeaderValue {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", escaped))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

impl IntoResponse for DownloadResponse {
    fn into_response(self) -> Response {
        let length = self.data.len();
        let mut response = Response::new(Body::from(self.data));
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        headers.insert(CONTENT_DISPOSITION, attachment_disposition(&self.filename));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_attachment_headers() {
        let response =
            DownloadResponse::pdf(Bytes::from_static(b"%PDF-1.5"), "User 42 - Evidence 2024-03-07.pdf")
                .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(response.headers()[CONTENT_LENGTH], "8");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"User 42 - Evidence 2024-03-07.pdf\""
        );
    }

    #[test]
    fn test_disposition_escapes_quotes() {
        assert_eq!(
            attachment_disposition("a\"b.pdf"),
            "attachment; filename=\"a\\\"b.pdf\""
        );
    }

    #[test]
    fn test_disposition_falls_back_for_control_characters() {
        assert_eq!(attachment_disposition("a\nb.pdf"), "attachment");
    }
}
