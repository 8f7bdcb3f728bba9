use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large (limit {0} bytes)")]
    PayloadTooLarge(u64),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("No image returned: {0}")]
    NoImageReturned(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::MalformedRequest(_)
            | AppError::UnsupportedMediaType(_)
            | AppError::PayloadTooLarge(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NoImageReturned(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UpstreamError(_) | AppError::InternalError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// "Missing <field>" for the first field that failed validation.
fn missing_field_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_keys().collect();
    fields.sort();
    match fields.first() {
        Some(field) => format!("Missing {}", field),
        None => "Invalid request".to_string(),
    }
}

fn format_limit(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{} bytes", bytes)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status();
        let allow_post = matches!(self, AppError::MethodNotAllowed);
        let (error_message, details) = match self {
            AppError::ValidationError(err) => (missing_field_message(&err), None),
            AppError::BadRequest(err) => (err.to_string(), None),
            AppError::MalformedRequest(msg) => (msg, None),
            AppError::UnsupportedMediaType(mime) => {
                (format!("Unsupported file type: {}", mime), None)
            }
            AppError::PayloadTooLarge(limit) => {
                (format!("File too large (max {})", format_limit(limit)), None)
            }
            AppError::MethodNotAllowed => ("Use POST".to_string(), None),
            AppError::NoImageReturned(msg) => (msg, None),
            AppError::UpstreamError(msg) => (msg, None),
            AppError::InternalError(err) => (
                "Internal server error".to_string(),
                Some(format!("{:#?}", err)),
            ),
            AppError::ServiceUnavailable => ("Service unavailable".to_string(), None),
            AppError::ConfigError(err) => {
                ("Configuration error".to_string(), Some(err.to_string()))
            }
        };

        let mut res = (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response();

        if allow_post {
            res.headers_mut().insert(
                axum::http::header::ALLOW,
                axum::http::HeaderValue::from_static("POST"),
            );
        }

        res
    }
}
