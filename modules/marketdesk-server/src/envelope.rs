//! The API response envelope every endpoint answers with:
//! `{success, status_code, message, data}` plus pagination fields on
//! listing endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use marketdesk_store::StoreError;

pub fn success<T: Serialize>(message: &str, data: T) -> Response {
    envelope(StatusCode::OK, message, Some(data))
}

pub fn created<T: Serialize>(message: &str, data: T) -> Response {
    envelope(StatusCode::CREATED, message, Some(data))
}

pub fn message_only(message: &str) -> Response {
    envelope::<()>(StatusCode::OK, message, None)
}

fn envelope<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> Response {
    (
        status,
        Json(json!({
            "success": true,
            "status_code": status.as_u16(),
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}

/// Pagination block for listing responses.
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub total_records: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageMeta {
    pub fn new(page: i64, limit: i64, total_records: i64) -> Self {
        let total_pages = if limit > 0 {
            (total_records + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total_pages,
            total_records,
            has_next: (page - 1) * limit + limit < total_records,
            has_previous: page > 1,
        }
    }
}

pub fn success_listing<T: Serialize>(message: &str, meta: PageMeta, data: T) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "status_code": StatusCode::OK.as_u16(),
            "message": message,
            "page": meta.page,
            "limit": meta.limit,
            "total_pages": meta.total_pages,
            "total_records": meta.total_records,
            "has_next": meta.has_next,
            "has_previous": meta.has_previous,
            "data": data,
        })),
    )
        .into_response()
}

/// Every failure an endpoint can answer with, mapped to the error envelope.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Auth(String),
    Forbidden,
    NotFound(&'static str),
    Conflict(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(msg) | ApiError::Auth(msg) | ApiError::Conflict(msg) => {
                msg.clone()
            }
            ApiError::Forbidden => "You are not authorized to perform this action".into(),
            ApiError::NotFound(what) => format!("{what} not found"),
            ApiError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            error!(error = %e, "request failed");
        }

        let status = self.status();
        (
            status,
            Json(json!({
                "success": false,
                "status_code": status.as_u16(),
                "message": self.message(),
                "data": null,
            })),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.into())
    }
}

/// Envelope-shaped 404 for unmatched paths.
pub async fn fallback(uri: axum::http::Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "status_code": StatusCode::NOT_FOUND.as_u16(),
            "message": format!("The requested resource '{}' not found", uri.path()),
            "data": null,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_meta_math() {
        let meta = PageMeta::new(2, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_previous);

        let last = PageMeta::new(3, 10, 25);
        assert!(!last.has_next);

        let first = PageMeta::new(1, 10, 5);
        assert!(!first.has_next);
        assert!(!first.has_previous);
    }

    #[test]
    fn error_statuses() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Post").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotFound("Post").message(), "Post not found");
    }
}
