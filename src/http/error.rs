use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::domain::aggregates::OrderError;
use crate::ShopError;

impl ShopError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound | Self::OrderNotFound | Self::PageNotFound => StatusCode::NOT_FOUND,
            Self::EmptyCart | Self::Cart(_) | Self::Value(_) => StatusCode::BAD_REQUEST,
            Self::Order(OrderError::NoItems) => StatusCode::BAD_REQUEST,
            Self::Order(_) | Self::Validation(_) | Self::UsernameTaken => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials | Self::LoginRequired => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Session(_) | Self::Export(_) | Self::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
