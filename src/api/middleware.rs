//! Error envelope rendering.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{ErrorKind, ErrorReport};

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub method: String,
    pub path: String,
}

/// Replace the body of any response carrying an [`ErrorReport`] with the JSON
/// error envelope, and log the failure with its request line.
pub async fn error_envelope(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().to_string();

    let response = next.run(request).await;
    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };
    let status = response.status();

    match (&report.kind, &report.cause) {
        (ErrorKind::DatabaseError, cause) => tracing::error!(
            method = %method,
            path = %path,
            status_code = status.as_u16(),
            cause = cause.as_deref().unwrap_or("-"),
            "Database error"
        ),
        (ErrorKind::HttpError, _) if status.is_server_error() => tracing::error!(
            method = %method,
            path = %path,
            status_code = status.as_u16(),
            message = %report.message,
            "HTTP exception"
        ),
        (ErrorKind::HttpError, _) => tracing::warn!(
            method = %method,
            path = %path,
            status_code = status.as_u16(),
            message = %report.message,
            "HTTP exception"
        ),
    }

    let envelope = ErrorEnvelope {
        error: ErrorBody {
            kind: report.kind,
            message: report.message,
            method,
            path,
        },
    };
    (status, Json(envelope)).into_response()
}
