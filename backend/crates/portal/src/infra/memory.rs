//! In-memory repository for tests
//!
//! Same observable semantics as the PostgreSQL adapter: unique
//! (venue, email), version compare-and-swap, retention-filtered reads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use kernel::id::{AdId, ComplianceEntryId, IdentityId, VenueId};
use parking_lot::Mutex;

use crate::domain::entity::{Ad, AdCounters, ComplianceEntry, IdentityRecord, InteractionEvent, Venue};
use crate::domain::repository::{
    AdRepository, ComplianceRepository, IdentityRepository, InteractionRepository, VenueDirectory,
};
use crate::domain::value_object::{Email, InteractionKind, SessionId};
use crate::error::{PortalError, PortalResult};

#[derive(Default)]
struct MemoryState {
    venues: HashMap<VenueId, Venue>,
    ads: HashMap<AdId, Ad>,
    identities: HashMap<(VenueId, String), IdentityRecord>,
    interactions: Vec<InteractionEvent>,
    compliance: Vec<ComplianceEntry>,
}

#[derive(Default)]
pub struct MemoryPortalRepository {
    state: Mutex<MemoryState>,
    fail_like_lookup: AtomicBool,
    fail_compliance_append: AtomicBool,
    fail_interaction_append: AtomicBool,
}

impl MemoryPortalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_venue(&self, venue: Venue) {
        self.state.lock().venues.insert(venue.venue_id, venue);
    }

    pub fn add_ad(&self, ad: Ad) {
        self.state.lock().ads.insert(ad.ad_id, ad);
    }

    pub fn fail_like_lookups(&self, fail: bool) {
        self.fail_like_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn fail_compliance_appends(&self, fail: bool) {
        self.fail_compliance_append.store(fail, Ordering::SeqCst);
    }

    pub fn fail_interaction_appends(&self, fail: bool) {
        self.fail_interaction_append.store(fail, Ordering::SeqCst);
    }

    pub fn counters(&self, ad_id: &AdId) -> AdCounters {
        self.state
            .lock()
            .ads
            .get(ad_id)
            .map(|ad| ad.counters)
            .unwrap_or_default()
    }

    pub fn identity(&self, venue_id: &VenueId, email: &str) -> Option<IdentityRecord> {
        self.state
            .lock()
            .identities
            .get(&(*venue_id, email.to_string()))
            .cloned()
    }

    pub fn identity_count(&self) -> usize {
        self.state.lock().identities.len()
    }

    pub fn interactions(&self, ad_id: &AdId, kind: InteractionKind) -> Vec<InteractionEvent> {
        self.state
            .lock()
            .interactions
            .iter()
            .filter(|e| e.ad_id == *ad_id && e.kind == kind)
            .cloned()
            .collect()
    }

    /// Every stored entry, expired or not
    pub fn raw_compliance(&self) -> Vec<ComplianceEntry> {
        self.state.lock().compliance.clone()
    }
}

impl VenueDirectory for MemoryPortalRepository {
    async fn find_venue(&self, venue_id: &VenueId) -> PortalResult<Option<Venue>> {
        Ok(self.state.lock().venues.get(venue_id).cloned())
    }
}

impl IdentityRepository for MemoryPortalRepository {
    async fn find_identity(
        &self,
        venue_id: &VenueId,
        email: &Email,
    ) -> PortalResult<Option<IdentityRecord>> {
        Ok(self.identity(venue_id, email.as_str()))
    }

    async fn insert_identity(&self, record: &IdentityRecord) -> PortalResult<bool> {
        let mut state = self.state.lock();
        let key = (record.venue_id, record.email.as_str().to_string());
        if state.identities.contains_key(&key) {
            return Ok(false);
        }
        state.identities.insert(key, record.clone());
        Ok(true)
    }

    async fn update_identity(&self, record: &IdentityRecord) -> PortalResult<bool> {
        let mut state = self.state.lock();
        let key = (record.venue_id, record.email.as_str().to_string());
        match state.identities.get_mut(&key) {
            Some(stored) if stored.version == record.version => {
                let mut next = record.clone();
                next.version += 1;
                *stored = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl AdRepository for MemoryPortalRepository {
    async fn find_ad(&self, ad_id: &AdId) -> PortalResult<Option<Ad>> {
        Ok(self.state.lock().ads.get(ad_id).cloned())
    }
}

impl InteractionRepository for MemoryPortalRepository {
    async fn recent_like_exists(
        &self,
        ad_id: &AdId,
        ip: Option<&str>,
        session_id: Option<&SessionId>,
        since: DateTime<Utc>,
    ) -> PortalResult<bool> {
        if self.fail_like_lookup.load(Ordering::SeqCst) {
            return Err(PortalError::Internal("like lookup unavailable".to_string()));
        }
        let state = self.state.lock();
        Ok(state.interactions.iter().any(|e| {
            e.ad_id == *ad_id
                && e.kind == InteractionKind::Like
                && e.created_at >= since
                && ((ip.is_some() && e.ip.as_deref() == ip)
                    || (session_id.is_some() && e.session_id.as_ref() == session_id))
        }))
    }

    async fn append_and_count(&self, event: &InteractionEvent) -> PortalResult<()> {
        let mut state = self.state.lock();
        if self.fail_interaction_append.load(Ordering::SeqCst) {
            return Err(PortalError::Internal("interaction store unavailable".to_string()));
        }
        let ad = state
            .ads
            .get_mut(&event.ad_id)
            .filter(|ad| ad.venue_id == event.venue_id)
            .ok_or_else(|| PortalError::Internal(format!("ad {} missing", event.ad_id)))?;
        ad.counters.increment(event.kind);
        state.interactions.push(event.clone());
        Ok(())
    }

    async fn link_session(
        &self,
        session_id: &SessionId,
        identity_id: &IdentityId,
        email: &Email,
    ) -> PortalResult<u64> {
        let mut state = self.state.lock();
        let mut linked = 0;
        for event in state
            .interactions
            .iter_mut()
            .filter(|e| e.session_id.as_ref() == Some(session_id) && e.email.is_none())
        {
            event.identity_id = Some(*identity_id);
            event.email = Some(email.clone());
            linked += 1;
        }
        Ok(linked)
    }

    async fn events_for_session(
        &self,
        session_id: &SessionId,
    ) -> PortalResult<Vec<InteractionEvent>> {
        Ok(self
            .state
            .lock()
            .interactions
            .iter()
            .filter(|e| e.session_id.as_ref() == Some(session_id))
            .cloned()
            .collect())
    }
}

impl ComplianceRepository for MemoryPortalRepository {
    async fn append_entry(&self, entry: &ComplianceEntry) -> PortalResult<()> {
        if self.fail_compliance_append.load(Ordering::SeqCst) {
            return Err(PortalError::Internal("compliance store unavailable".to_string()));
        }
        self.state.lock().compliance.push(entry.clone());
        Ok(())
    }

    async fn find_entry(
        &self,
        entry_id: &ComplianceEntryId,
        now: DateTime<Utc>,
    ) -> PortalResult<Option<ComplianceEntry>> {
        Ok(self
            .state
            .lock()
            .compliance
            .iter()
            .find(|e| e.entry_id == *entry_id && !e.is_expired(now))
            .cloned())
    }

    async fn close_entry(&self, entry: &ComplianceEntry, now: DateTime<Utc>) -> PortalResult<bool> {
        let mut state = self.state.lock();
        match state
            .compliance
            .iter_mut()
            .find(|e| e.entry_id == entry.entry_id && !e.is_expired(now))
        {
            Some(stored) if stored.logout_at.is_none() => {
                stored.logout_at = entry.logout_at;
                stored.session_minutes = entry.session_minutes;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_venue(
        &self,
        venue_id: &VenueId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> PortalResult<Vec<ComplianceEntry>> {
        let state = self.state.lock();
        let mut entries: Vec<ComplianceEntry> = state
            .compliance
            .iter()
            .filter(|e| e.venue_id == *venue_id && !e.is_expired(now))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.login_at.cmp(&a.login_at));
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> PortalResult<u64> {
        let mut state = self.state.lock();
        let before = state.compliance.len();
        state.compliance.retain(|e| !e.is_expired(now));
        Ok((before - state.compliance.len()) as u64)
    }
}
