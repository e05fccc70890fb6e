//! Error types for feedesk-api
//!
//! Form posts report workflow failures as alert fragments (see
//! `routes::failure_alert`); only missing records and failed downloads
//! surface as error statuses.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use feedesk_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error(transparent)]
    Export(#[from] CoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors render as the same red alert fragment the forms use, so HTMX
/// targets can swap them in directly
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::warn!("Request failed: {}", self);
        let title = match &self {
            ApiError::NotFound { .. } => "Not found",
            ApiError::Export(_) => "Failed",
        };
        (self.status(), Html(crate::alert_error(title, &self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::body_text;

    #[tokio::test]
    async fn test_not_found_renders_alert() {
        let response = ApiError::NotFound {
            resource: "student 9".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = body_text(response).await;
        assert!(html.contains("Not found"));
        assert!(html.contains("student 9"));
    }

    #[test]
    fn test_export_failure_is_server_error() {
        let error = ApiError::from(CoreError::Encoding(
            String::from_utf8(vec![0xff]).unwrap_err(),
        ));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
