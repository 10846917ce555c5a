//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};
use kernel::id::{AdId, ComplianceEntryId, IdentityId, VenueId};

use crate::domain::entity::{Ad, ComplianceEntry, IdentityRecord, InteractionEvent, Venue};
use crate::domain::value_object::{Email, SessionId};
use crate::error::PortalResult;

/// Venue directory (read-only collaborator)
#[trait_variant::make(VenueDirectory: Send)]
pub trait LocalVenueDirectory {
    async fn find_venue(&self, venue_id: &VenueId) -> PortalResult<Option<Venue>>;
}

/// Identity record store
///
/// Writes are optimistic: callers read, transition the record in memory,
/// then write back and retry when the write reports a lost race.
#[trait_variant::make(IdentityRepository: Send)]
pub trait LocalIdentityRepository {
    async fn find_identity(
        &self,
        venue_id: &VenueId,
        email: &Email,
    ) -> PortalResult<Option<IdentityRecord>>;

    /// Insert a new record; `false` if one already exists for (venue, email)
    async fn insert_identity(&self, record: &IdentityRecord) -> PortalResult<bool>;

    /// Store `record` if its `version` is still current; `false` otherwise
    async fn update_identity(&self, record: &IdentityRecord) -> PortalResult<bool>;
}

#[trait_variant::make(AdRepository: Send)]
pub trait LocalAdRepository {
    async fn find_ad(&self, ad_id: &AdId) -> PortalResult<Option<Ad>>;
}

/// Ad interaction event log
#[trait_variant::make(InteractionRepository: Send)]
pub trait LocalInteractionRepository {
    /// A like on `ad_id` since `since` from the same address or session
    async fn recent_like_exists(
        &self,
        ad_id: &AdId,
        ip: Option<&str>,
        session_id: Option<&SessionId>,
        since: DateTime<Utc>,
    ) -> PortalResult<bool>;

    /// Append the event and bump the matching ad counter, atomically
    async fn append_and_count(&self, event: &InteractionEvent) -> PortalResult<()>;

    /// Attribute anonymous events of a session; returns rows touched
    async fn link_session(
        &self,
        session_id: &SessionId,
        identity_id: &IdentityId,
        email: &Email,
    ) -> PortalResult<u64>;

    async fn events_for_session(&self, session_id: &SessionId)
    -> PortalResult<Vec<InteractionEvent>>;
}

/// Compliance log
///
/// Every read takes `now` and hides entries past their retention horizon.
#[trait_variant::make(ComplianceRepository: Send)]
pub trait LocalComplianceRepository {
    async fn append_entry(&self, entry: &ComplianceEntry) -> PortalResult<()>;

    async fn find_entry(
        &self,
        entry_id: &ComplianceEntryId,
        now: DateTime<Utc>,
    ) -> PortalResult<Option<ComplianceEntry>>;

    /// Set logout fields if still unset; `false` if already closed or gone
    async fn close_entry(&self, entry: &ComplianceEntry, now: DateTime<Utc>) -> PortalResult<bool>;

    async fn list_for_venue(
        &self,
        venue_id: &VenueId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> PortalResult<Vec<ComplianceEntry>>;

    /// Physically delete expired entries
    async fn purge_expired(&self, now: DateTime<Utc>) -> PortalResult<u64>;
}

/// Everything the portal persists, behind one handle
pub trait PortalStore:
    VenueDirectory
    + IdentityRepository
    + AdRepository
    + InteractionRepository
    + ComplianceRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> PortalStore for T where
    T: VenueDirectory
        + IdentityRepository
        + AdRepository
        + InteractionRepository
        + ComplianceRepository
        + Send
        + Sync
        + 'static
{
}
