//! Domain Layer
//!
//! Entities, value objects, the OTP engine, repository and gateway traits.

pub mod entity;
pub mod gateway;
pub mod otp;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{ComplianceEntry, IdentityRecord, InteractionEvent, Venue};
pub use gateway::{CodeMailer, FederatedIdentity, GatewayError, IdentityVerifier};
pub use otp::{IssuedCode, OtpEngine, OtpPolicy};
pub use repository::{
    AdRepository, ComplianceRepository, IdentityRepository, InteractionRepository, PortalStore,
    VenueDirectory,
};
