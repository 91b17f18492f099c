//! Error responses
//!
//! Every failure leaves the API as `{"detail": "..."}` with a status derived
//! from the error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};
use tunebox_common::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Duplicate(_)
            | Error::InvalidInput(_)
            | Error::NoActivePlayer
            | Error::NoPlayersFound => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Store(_) | Error::MediaServer(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match &self.0 {
            Error::Duplicate(msg) | Error::InvalidInput(msg) | Error::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Duplicate("x".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::NoActivePlayer, StatusCode::BAD_REQUEST),
            (Error::NoPlayersFound, StatusCode::BAD_REQUEST),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::MediaServer("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::Store(sqlx::Error::PoolClosed), StatusCode::SERVICE_UNAVAILABLE),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError(error).status(), expected);
        }
    }

    #[test]
    fn test_client_errors_carry_bare_message() {
        let err = ApiError(Error::Duplicate("Song X is already in the queue.".into()));
        assert_eq!(err.detail(), "Song X is already in the queue.");

        let err = ApiError(Error::NoActivePlayer);
        assert_eq!(err.detail(), "No active player found");
    }
}
