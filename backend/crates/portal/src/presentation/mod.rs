//! Presentation Layer
//!
//! HTTP handlers, DTOs, and routing.

pub mod dto;
pub mod handlers;
pub mod router;

pub use handlers::PortalAppState;
pub use router::{portal_router, portal_router_generic};
