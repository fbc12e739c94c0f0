use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use wisp_db::StoreError;
use wisp_types::api::ErrorResponse;

/// Everything a handler can fail with.
///
/// Client errors carry a message that is safe to show; storage and internal
/// failures are logged and answered with a generic body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("too many requests, try again shortly")]
    RateLimited,

    #[error("{}", .0.body_text())]
    Body(#[from] JsonRejection),

    #[error("{}", .0.body_text())]
    Query(#[from] QueryRejection),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => match err {
                StoreError::Validation(_) => StatusCode::BAD_REQUEST,
                StoreError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                StoreError::NotFound => StatusCode::NOT_FOUND,
                StoreError::Expired | StoreError::RoomGone => StatusCode::GONE,
                StoreError::Forbidden => StatusCode::FORBIDDEN,
                StoreError::StorageTimeout => StatusCode::SERVICE_UNAVAILABLE,
                StoreError::Sqlite(_) | StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Body(_) | Self::Query(_) => StatusCode::BAD_REQUEST,
            Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Internal error: {}", self);
                "internal server error".to_string()
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                error!("Storage timeout: {}", self);
                "storage busy, try again".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
