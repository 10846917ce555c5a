//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod google;
pub mod mailer;
#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use google::{GoogleIdentityVerifier, JwksKeySource};
pub use mailer::{ConfiguredMailer, HttpMailer};
pub use postgres::PgPortalRepository;
