//! Check Verification Status Use Case
//!
//! Read-only lookup of a visitor's standing at a venue.

use std::sync::Arc;

use kernel::id::VenueId;

use crate::application::venue_access::require_active_venue;
use crate::domain::repository::{IdentityRepository, VenueDirectory};
use crate::domain::value_object::{AuthMethod, Email};
use crate::error::PortalResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationStatus {
    pub is_verified: bool,
    pub visit_count: u32,
    /// Method of the latest verification; `None` until verified
    pub auth_method: Option<AuthMethod>,
}

pub struct CheckStatusUseCase<R>
where
    R: VenueDirectory + IdentityRepository,
{
    repo: Arc<R>,
}

impl<R> CheckStatusUseCase<R>
where
    R: VenueDirectory + IdentityRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, venue_id: &VenueId, email: &str) -> PortalResult<VerificationStatus> {
        let venue = require_active_venue(self.repo.as_ref(), venue_id).await?;
        let email = Email::new(email)?;

        let status = match self.repo.find_identity(&venue.venue_id, &email).await? {
            Some(record) => VerificationStatus {
                is_verified: record.is_verified,
                visit_count: record.visit_count,
                auth_method: record.is_verified.then_some(record.auth_method),
            },
            None => VerificationStatus {
                is_verified: false,
                visit_count: 0,
                auth_method: None,
            },
        };
        Ok(status)
    }
}
