//! Portal Error Types
//!
//! Portal-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Messages are user-safe; provider and
//! database detail stays in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::rate_limit::ceil_minutes;
use thiserror::Error;

/// Portal-specific result type alias
pub type PortalResult<T> = Result<T, PortalError>;

/// Which limit rejected an OTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RateLimitScope {
    /// Hourly request quota per identity record
    #[display("quota")]
    Quota,
    /// Minimum gap between two codes
    #[display("cooldown")]
    Cooldown,
}

#[derive(Debug, Error)]
pub enum PortalError {
    /// Unknown venue
    #[error("Venue not found")]
    VenueNotFound,

    /// Unknown ad, or an ad that belongs to another venue
    #[error("Ad not found")]
    AdNotFound,

    /// Venue exists but is switched off
    #[error("This venue is not currently accepting connections")]
    VenueInactive,

    /// No OTP pending for this visitor
    #[error("No verification code is pending. Please request a new code.")]
    NoPendingCode,

    /// OTP quota or resend cooldown hit
    #[error("{}", rate_limit_message(*scope, *retry_after_secs))]
    RateLimited {
        scope: RateLimitScope,
        retry_after_secs: u64,
    },

    /// OTP past its expiry
    #[error("The verification code has expired. Please request a new code.")]
    CodeExpired,

    /// Wrong OTP
    #[error("Invalid verification code")]
    InvalidCode,

    /// Federated assertion failed verification
    #[error("Sign-in could not be verified")]
    InvalidAssertion,

    /// Email collaborator could not deliver the code
    #[error("The verification code could not be sent. Please try again.")]
    DeliveryFailed,

    /// Compliance entry unknown or past retention
    #[error("Log entry not found")]
    EntryNotFound,

    /// Malformed input
    #[error("{0}")]
    InvalidRequest(String),

    /// Export credential missing or not valid for this venue
    #[error("Access denied")]
    Forbidden,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn rate_limit_message(scope: RateLimitScope, secs: u64) -> String {
    match scope {
        RateLimitScope::Quota => format!(
            "Too many code requests. Please try again in {} minute(s).",
            ceil_minutes(secs)
        ),
        RateLimitScope::Cooldown => format!(
            "Please wait {} second(s) before requesting a new code.",
            secs
        ),
    }
}

impl PortalError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::VenueNotFound
            | PortalError::AdNotFound
            | PortalError::NoPendingCode
            | PortalError::EntryNotFound => StatusCode::NOT_FOUND,
            PortalError::VenueInactive | PortalError::DeliveryFailed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PortalError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PortalError::CodeExpired | PortalError::InvalidCode | PortalError::InvalidAssertion => {
                StatusCode::UNAUTHORIZED
            }
            PortalError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PortalError::Forbidden => StatusCode::FORBIDDEN,
            PortalError::Database(_) | PortalError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::VenueNotFound
            | PortalError::AdNotFound
            | PortalError::NoPendingCode
            | PortalError::EntryNotFound => ErrorKind::NotFound,
            PortalError::VenueInactive | PortalError::DeliveryFailed => {
                ErrorKind::ServiceUnavailable
            }
            PortalError::RateLimited { .. } => ErrorKind::TooManyRequests,
            PortalError::CodeExpired | PortalError::InvalidCode | PortalError::InvalidAssertion => {
                ErrorKind::Unauthorized
            }
            PortalError::InvalidRequest(_) => ErrorKind::BadRequest,
            PortalError::Forbidden => ErrorKind::Forbidden,
            PortalError::Database(_) | PortalError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Wait hint for rate-limited responses
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            PortalError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let message = match self {
            PortalError::Database(_) | PortalError::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            _ => self.to_string(),
        };
        let err = AppError::new(self.kind(), message);
        match self.retry_after_secs() {
            Some(secs) => err.with_retry_after(secs),
            None => err,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            PortalError::Database(e) => {
                tracing::error!(error = %e, "Portal database error");
            }
            PortalError::Internal(msg) => {
                tracing::error!(message = %msg, "Portal internal error");
            }
            PortalError::CodeExpired | PortalError::InvalidCode | PortalError::InvalidAssertion => {
                tracing::warn!(error = %self, "Verification rejected");
            }
            PortalError::RateLimited {
                scope,
                retry_after_secs,
            } => {
                tracing::warn!(%scope, retry_after_secs, "OTP request rate limited");
            }
            PortalError::DeliveryFailed => {
                tracing::warn!("OTP delivery failed");
            }
            _ => {
                tracing::debug!(error = %self, "Portal error");
            }
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for PortalError {
    fn from(err: AppError) -> Self {
        if err.is_server_error() {
            PortalError::Internal(err.to_string())
        } else {
            PortalError::InvalidRequest(err.message().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PortalError::VenueNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(PortalError::NoPendingCode.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(PortalError::CodeExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(PortalError::AdNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(PortalError::InvalidCode.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            PortalError::InvalidAssertion.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PortalError::VenueInactive.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PortalError::Forbidden.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_kind_agrees_with_status() {
        let errors = [
            PortalError::VenueNotFound,
            PortalError::AdNotFound,
            PortalError::VenueInactive,
            PortalError::NoPendingCode,
            PortalError::RateLimited {
                scope: RateLimitScope::Cooldown,
                retry_after_secs: 5,
            },
            PortalError::CodeExpired,
            PortalError::InvalidCode,
            PortalError::InvalidAssertion,
            PortalError::DeliveryFailed,
            PortalError::EntryNotFound,
            PortalError::InvalidRequest("bad".into()),
            PortalError::Forbidden,
            PortalError::Internal("x".into()),
        ];
        for err in errors {
            assert_eq!(err.status_code().as_u16(), err.kind().status_code());
        }
    }

    #[test]
    fn test_rate_limit_messages_carry_wait() {
        let cooldown = PortalError::RateLimited {
            scope: RateLimitScope::Cooldown,
            retry_after_secs: 42,
        };
        assert!(cooldown.to_string().contains("42 second"));
        assert_eq!(cooldown.to_app_error().retry_after_secs(), Some(42));

        let quota = PortalError::RateLimited {
            scope: RateLimitScope::Quota,
            retry_after_secs: 61,
        };
        assert!(quota.to_string().contains("2 minute"));
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = PortalError::Internal("connection string leaked".into());
        assert!(!err.to_app_error().message().contains("leaked"));
    }

    #[test]
    fn test_response_has_retry_after_header() {
        let response = PortalError::RateLimited {
            scope: RateLimitScope::Cooldown,
            retry_after_secs: 30,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(axum::http::header::RETRY_AFTER));
    }
}
