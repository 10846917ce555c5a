//! Application Layer
//!
//! Use cases and application services.

pub mod check_status;
pub mod completion;
pub mod compliance_logger;
pub mod config;
pub mod federated_sign_in;
pub mod identity_writer;
pub mod interaction_tracker;
pub mod request_otp;
pub mod session_linker;
pub mod venue_access;
pub mod verify_otp;

// Re-exports
pub use check_status::{CheckStatusUseCase, VerificationStatus};
pub use completion::{CompleteVerification, CompletionContext, VerificationOutcome};
pub use compliance_logger::ComplianceLogger;
pub use config::{ExportCredentials, ExportScope, PortalConfig};
pub use federated_sign_in::{FederatedSignInInput, FederatedSignInOutput, FederatedSignInUseCase};
pub use interaction_tracker::{InteractionTracker, RecordInteractionInput, RecordInteractionOutput};
pub use request_otp::{RequestOtpInput, RequestOtpOutput, RequestOtpUseCase};
pub use session_linker::SessionLinker;
pub use verify_otp::{VerifyOtpInput, VerifyOtpUseCase};
