use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_claims::TokenError;
use serde::Serialize;
use thiserror::Error;

pub type FactoryResult<T> = Result<T, FactoryError>;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("working outside of an application context: bind the factory to an application or pass the current one")]
    NoApplicationContext,
    #[error("{key} must be a positive number of seconds, got {seconds}")]
    InvalidValidity { key: &'static str, seconds: i64 },
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl FactoryError {
    pub fn code(&self) -> &'static str {
        match self {
            FactoryError::NoApplicationContext => "no_application_context",
            FactoryError::InvalidValidity { .. } => "invalid_validity",
            FactoryError::MissingAuthorization | FactoryError::InvalidAuthorization => {
                "auth_header"
            }
            FactoryError::Token(err) => err.code(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for FactoryError {
    fn into_response(self) -> Response {
        let status = match &self {
            FactoryError::NoApplicationContext | FactoryError::InvalidValidity { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            FactoryError::Token(err) if err.is_creation_error() => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            FactoryError::MissingAuthorization
            | FactoryError::InvalidAuthorization
            | FactoryError::Token(_) => StatusCode::UNAUTHORIZED,
        };

        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
