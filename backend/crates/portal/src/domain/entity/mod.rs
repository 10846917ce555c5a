//! Entity Module

pub mod ad;
pub mod compliance;
pub mod identity;
pub mod interaction;
pub mod venue;

pub use ad::{Ad, AdCounters};
pub use compliance::ComplianceEntry;
pub use identity::{IdentityRecord, PendingCode, VerificationState};
pub use interaction::InteractionEvent;
pub use venue::Venue;
