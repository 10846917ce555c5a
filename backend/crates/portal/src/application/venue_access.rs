use kernel::id::VenueId;

use crate::domain::entity::Venue;
use crate::domain::repository::VenueDirectory;
use crate::error::{PortalError, PortalResult};

/// Load a venue that is accepting connections
pub async fn require_active_venue<R: VenueDirectory>(
    repo: &R,
    venue_id: &VenueId,
) -> PortalResult<Venue> {
    let venue = repo
        .find_venue(venue_id)
        .await?
        .ok_or(PortalError::VenueNotFound)?;
    venue.ensure_active()?;
    Ok(venue)
}
