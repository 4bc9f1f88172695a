// Error-to-banner mapping for the HTTP surface. Every failure is caught at the
// boundary of the operation that produced it and rendered as a JSON body the
// front-end shows as a banner; nothing crashes the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::gemini::ModelError;
use crate::table::ParseError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("failed to render template: {0}")]
    Template(#[from] minijinja::Error),
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Parse(_) => "parse",
            AppError::Model(_) => "model",
            AppError::Template(_) => "internal",
            AppError::BadRequest(_) => "request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Parse(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Model(_) => StatusCode::BAD_GATEWAY,
            AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!(kind = self.kind(), "request failed: {}", self);
        let body = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_map_to_bad_request() {
        let err = AppError::from(ParseError::Empty);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_model_errors_map_to_bad_gateway() {
        let err = AppError::from(ModelError::Empty);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.kind(), "model");
    }
}
