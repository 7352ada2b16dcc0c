//! HTTP error mapping.
//!
//! Wire contract for client errors: `{"detail": "<reason>"}`. Cursor
//! validation failures surface as 400s with the codec's stable reason
//! strings; upstream fetch failures surface as 502s without leaking the
//! underlying error text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokenfit_paginate::PageError;

/// An error response with a human-readable reason.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status to return.
    pub status: StatusCode,
    /// Reason placed in the `detail` body field.
    pub detail: String,
}

impl ApiError {
    /// A 404 with the given reason.
    pub fn not_found(detail: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"detail": self.detail}))).into_response()
    }
}

impl From<PageError> for ApiError {
    fn from(error: PageError) -> Self {
        match error {
            PageError::Cursor(cursor_error) => Self {
                status: StatusCode::BAD_REQUEST,
                detail: cursor_error.to_string(),
            },
            PageError::Fetch(source) => {
                tracing::error!(
                    target: "tokenfit::routes",
                    error = %source,
                    "upstream fetch failed"
                );
                Self {
                    status: StatusCode::BAD_GATEWAY,
                    detail: "upstream fetch failed".to_string(),
                }
            }
        }
    }
}
