//! services/api/src/web/errors.rs
//!
//! Maps port failures onto the `(StatusCode, String)` pairs the handlers return.

use axum::http::StatusCode;
use doctor_finder_core::ports::PortError;
use doctor_finder_core::validation::ValidationError;
use tracing::{error, warn};

pub type HandlerError = (StatusCode, String);

/// Logs `e` and converts it into a user-facing response. `context` is the message
/// shown when the failure is internal.
pub fn port_failure(context: &str, e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => {
            warn!("{}: {}", context, msg);
            (StatusCode::NOT_FOUND, msg)
        }
        PortError::Conflict(msg) => {
            warn!("{}: {}", context, msg);
            (StatusCode::CONFLICT, msg)
        }
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            format!(
                "Please wait {} seconds before requesting a new code.",
                retry_after_secs
            ),
        ),
        PortError::Unavailable(msg) => {
            error!("{}: {}", context, msg);
            (StatusCode::SERVICE_UNAVAILABLE, context.to_string())
        }
        PortError::Unexpected(msg) => {
            error!("{}: {}", context, msg);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

pub fn invalid(e: ValidationError) -> HandlerError {
    (StatusCode::BAD_REQUEST, e.message)
}
