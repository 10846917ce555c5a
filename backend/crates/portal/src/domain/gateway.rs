//! Gateway Traits
//!
//! Outbound collaborators: the email dispatcher and the federated identity
//! provider. Implementations live in the infrastructure layer.

use thiserror::Error;

use crate::domain::value_object::Email;

/// Failure talking to an outbound collaborator
///
/// Kept out of HTTP responses; callers map it to a user-safe error.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream rejected request with status {0}")]
    Rejected(u16),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("signing key unavailable: {0}")]
    SigningKey(String),

    #[error("timed out")]
    Timeout,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return GatewayError::Timeout;
        }
        match err.status() {
            Some(status) => GatewayError::Rejected(status.as_u16()),
            None => GatewayError::Transport(err.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for GatewayError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        GatewayError::InvalidToken(err.to_string())
    }
}

// ============================================================================
// Email dispatch
// ============================================================================

/// Why a code is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum CodePurpose {
    #[display("wifi_verification")]
    WifiVerification,
}

/// One code email
#[derive(Debug, Clone, Copy)]
pub struct CodeMessage<'a> {
    pub to: &'a Email,
    pub code: &'a str,
    pub purpose: CodePurpose,
    pub venue_name: Option<&'a str>,
    pub expiry_minutes: u64,
}

#[trait_variant::make(CodeMailer: Send)]
pub trait LocalCodeMailer {
    async fn send(&self, message: CodeMessage<'_>) -> Result<(), GatewayError>;
}

// ============================================================================
// Federated identity
// ============================================================================

/// Claims extracted from a verified third-party assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    /// Stable provider subject id
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    /// Avatar URL
    pub picture: Option<String>,
}

#[trait_variant::make(IdentityVerifier: Send)]
pub trait LocalIdentityVerifier {
    /// Check signature, audience, issuer and expiry of `assertion`
    async fn verify(
        &self,
        assertion: &str,
        expected_audience: &str,
    ) -> Result<FederatedIdentity, GatewayError>;
}
