use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use imgrepo_core::RepoError;
use imgrepo_model::{ErrorBody, ErrorDetail, ErrorKind};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn new(
        status: StatusCode,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorKind::Authentication, message)
    }
}

/// HTTP status for each kind of the error taxonomy.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Authentication | ErrorKind::Credential => StatusCode::UNAUTHORIZED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation | ErrorKind::Transport => StatusCode::BAD_REQUEST,
        ErrorKind::Duplicate => StatusCode::CONFLICT,
        ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: ErrorDetail {
                kind: self.kind,
                message: self.message,
                status: self.status.as_u16(),
            },
        });

        (self.status, body).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        let kind = err.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, kind, err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (RepoError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (RepoError::Credential, StatusCode::UNAUTHORIZED),
            (RepoError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (RepoError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (RepoError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (RepoError::Duplicate("x".into()), StatusCode::CONFLICT),
            (RepoError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (RepoError::DeadlineExceeded("x".into()), StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            let kind = err.kind();
            let app = AppError::from(err);
            assert_eq!(app.status, status);
            assert_eq!(app.kind, kind);
        }
    }
}
