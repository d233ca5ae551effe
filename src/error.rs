use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    BadRequest { status: StatusCode, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Category reported in the `type` field of the error envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    HttpError,
    DatabaseError,
}

/// Error details attached to a response as an extension.
///
/// Handlers don't see the request line, so the envelope itself is rendered
/// by [`crate::api::middleware::error_envelope`], which does.
#[derive(Clone, Debug)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    /// Server-side cause, logged but never sent to the client.
    pub cause: Option<String>,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::BadRequest { status, .. } => *status,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn report(&self) -> ErrorReport {
        match self {
            ServerError::Database(err) => ErrorReport {
                kind: ErrorKind::DatabaseError,
                message: "Database error".to_string(),
                cause: Some(err.to_string()),
            },
            _ => ErrorReport {
                kind: ErrorKind::HttpError,
                message: self.to_string(),
                cause: None,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let report = self.report();
        let mut response = (self.status(), report.message.clone()).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
