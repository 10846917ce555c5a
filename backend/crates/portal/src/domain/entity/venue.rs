//! Venue (read-only collaborator)
//!
//! The portal only needs to know whether a venue is live and where to
//! send visitors once they are connected.

use kernel::id::VenueId;

use crate::error::{PortalError, PortalResult};

#[derive(Debug, Clone)]
pub struct Venue {
    pub venue_id: VenueId,
    pub name: String,
    pub is_active: bool,
    /// Post-connect redirect (e.g. review page); unset falls back to a default
    pub redirect_url: Option<String>,
}

impl Venue {
    pub fn ensure_active(&self) -> PortalResult<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(PortalError::VenueInactive)
        }
    }

    /// Configured redirect, or `default` when unset or blank
    pub fn redirect_target<'a>(&'a self, default: &'a str) -> &'a str {
        self.redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(default)
    }
}
