use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
///
/// Every variant maps to a status-like code (see [`AppError::status_code`]) so
/// the HTTP layer never has to re-derive semantics from message text.
#[derive(Debug)]
pub enum AppError {
    /// Caller-supplied parameter missing or empty.
    BadRequest(String),
    /// The provider was reachable but the requested entity does not resolve.
    NotFound(String),
    /// The provider explicitly reported `success: false` for the request.
    Conflict(String),
    /// Transport failure, non-200 status or undecodable body from the provider.
    UpstreamUnavailable {
        /// HTTP status returned by the provider, when there was one.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },
    /// Local serialization bugs and other unexpected failures.
    InternalError(String),
    /// Database-related errors (audit store only).
    DatabaseError(sqlx::Error),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Builds an upstream failure that carries no HTTP status.
    pub fn upstream(message: impl Into<String>) -> Self {
        AppError::UpstreamUnavailable {
            status: None,
            message: message.into(),
        }
    }

    /// Status-like code for this error: 400, 404, 409 or 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UpstreamUnavailable { .. }
            | AppError::InternalError(_)
            | AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WithContext { source, .. } => source.status_code(),
        }
    }

    /// Innermost error once all context layers are peeled off.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Message that is safe to hand to an end user.
    fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::UpstreamUnavailable { .. } => "Steam API unavailable".to_string(),
            AppError::InternalError(_) | AppError::DatabaseError(_) => {
                "Internal server error".to_string()
            }
            AppError::WithContext { source, .. } => source.public_message(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::UpstreamUnavailable {
                status: Some(code),
                message,
            } => write!(f, "Upstream unavailable ({}): {}", code, message),
            AppError::UpstreamUnavailable {
                status: None,
                message,
            } => write!(f, "Upstream unavailable: {}", message),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Client errors echo their message; 500-class errors are logged and
    /// replaced by a generic message.
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self.root() {
            AppError::UpstreamUnavailable { .. } => {
                tracing::error!("Steam API error: {}", self);
            }
            AppError::InternalError(_) | AppError::DatabaseError(_) => {
                tracing::error!("Internal error: {}", self);
            }
            _ => {}
        }

        let body = Json(json!({
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    /// Converts a `sqlx::Error` into an `AppError`.
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<serde_json::Error> for AppError {
    /// Local encode/decode failures are bugs, not upstream problems.
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }
}
