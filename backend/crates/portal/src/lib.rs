//! Portal (Captive Wi-Fi) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, OTP engine, repository and gateway traits
//! - `application/` - Use cases and application services
//! - `infra/` - Database, identity provider and mail relay implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Email one-time codes (6 digits, 10 minutes, 3 per hour, 60 s resend cooldown)
//! - Google sign-in via ID token verification
//! - Per-venue post-connect redirects
//! - Ad interaction tracking with like de-duplication and atomic counters
//! - Compliance login log with a 365-day retention horizon
//! - Attribution of anonymous session activity once a visitor verifies
//!
//! ## Security Model
//! - Codes drawn from the OS CSPRNG, stored only as salted Argon2id hashes
//! - Quota and cooldown checked and counted in one compare-and-swap write
//! - Provider and database error detail never reaches the caller

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::PortalConfig;
pub use error::{PortalError, PortalResult};
pub use infra::postgres::PgPortalRepository;
pub use presentation::router::portal_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod router {
    pub use crate::presentation::router::*;
}
