use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chback_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required query parameter is absent
    #[error("No {name} specified")]
    MissingParam { name: &'static str, status: StatusCode },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn missing(name: &'static str, status: StatusCode) -> Self {
        ApiError::MissingParam { name, status }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingParam { .. } => "missing_param",
            ApiError::Core(e) => e.kind().as_str(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParam { status, .. } => *status,
            ApiError::Core(e) => StatusCode::from_u16(e.kind().status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::debug!(%status, kind = self.kind(), "Request rejected");
        }

        (status, self.to_string()).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
