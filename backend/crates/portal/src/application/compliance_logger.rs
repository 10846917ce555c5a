//! Compliance Logger
//!
//! Regulator-mandated login audit trail. One entry per successful
//! verification, closed by an explicit logout, hidden from every query once
//! its retention horizon passes.

use std::sync::Arc;

use kernel::id::{ComplianceEntryId, VenueId};
use platform::clock::Clock;

use crate::domain::entity::ComplianceEntry;
use crate::domain::repository::ComplianceRepository;
use crate::error::{PortalError, PortalResult};

pub struct ComplianceLogger<R: ComplianceRepository> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R: ComplianceRepository> Clone for ComplianceLogger<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<R: ComplianceRepository> ComplianceLogger<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Append a login entry
    pub async fn log_login(&self, entry: ComplianceEntry) -> PortalResult<()> {
        self.repo.append_entry(&entry).await?;

        tracing::info!(
            entry_id = %entry.entry_id,
            venue_id = %entry.venue_id,
            identity_id = %entry.identity_id,
            "Compliance login recorded"
        );
        Ok(())
    }

    /// Close an entry; a second logout leaves the first one in place
    pub async fn log_logout(&self, entry_id: &ComplianceEntryId) -> PortalResult<ComplianceEntry> {
        let now = self.clock.now();
        let mut entry = self
            .repo
            .find_entry(entry_id, now)
            .await?
            .ok_or(PortalError::EntryNotFound)?;

        if !entry.record_logout(now) {
            return Ok(entry);
        }

        if self.repo.close_entry(&entry, now).await? {
            tracing::info!(
                entry_id = %entry.entry_id,
                venue_id = %entry.venue_id,
                session_minutes = entry.session_minutes,
                "Compliance logout recorded"
            );
            return Ok(entry);
        }

        // closed concurrently, or crossed the horizon in between
        self.repo
            .find_entry(entry_id, now)
            .await?
            .ok_or(PortalError::EntryNotFound)
    }

    pub async fn find(&self, entry_id: &ComplianceEntryId) -> PortalResult<ComplianceEntry> {
        self.repo
            .find_entry(entry_id, self.clock.now())
            .await?
            .ok_or(PortalError::EntryNotFound)
    }

    /// Entries still inside the retention horizon, newest first
    pub async fn list_for_venue(
        &self,
        venue_id: &VenueId,
        limit: u32,
    ) -> PortalResult<Vec<ComplianceEntry>> {
        self.repo
            .list_for_venue(venue_id, self.clock.now(), limit)
            .await
    }

    pub async fn purge_expired(&self) -> PortalResult<u64> {
        let purged = self.repo.purge_expired(self.clock.now()).await?;
        if purged > 0 {
            tracing::info!(purged, "Purged expired compliance entries");
        }
        Ok(purged)
    }
}
