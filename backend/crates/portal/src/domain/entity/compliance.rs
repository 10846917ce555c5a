//! Compliance Log Entry Entity
//!
//! Regulator-mandated login record. Retention is absolute: an entry stops
//! existing for every query once `expires_at` is reached, whether or not
//! it has been physically purged yet.

use chrono::{DateTime, Duration, Utc};
use kernel::id::{ComplianceEntryId, IdentityId, VenueId};

use crate::domain::value_object::{Email, MacAddress};

#[derive(Debug, Clone)]
pub struct ComplianceEntry {
    pub entry_id: ComplianceEntryId,
    pub venue_id: VenueId,
    pub identity_id: IdentityId,
    pub mac_address: Option<MacAddress>,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub login_at: DateTime<Utc>,
    pub logout_at: Option<DateTime<Utc>>,
    /// Whole minutes between login and logout
    pub session_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ComplianceEntry {
    pub fn new_login(
        entry_id: ComplianceEntryId,
        venue_id: VenueId,
        identity_id: IdentityId,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Self {
        Self {
            entry_id,
            venue_id,
            identity_id,
            mac_address: None,
            email: None,
            phone: None,
            ip: None,
            user_agent: None,
            login_at: now,
            logout_at: None,
            session_minutes: None,
            created_at: now,
            expires_at: now + retention,
        }
    }

    /// Past the retention horizon
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Close the session once; later calls leave the first logout intact
    pub fn record_logout(&mut self, now: DateTime<Utc>) -> bool {
        if self.logout_at.is_some() {
            return false;
        }
        self.logout_at = Some(now);
        self.session_minutes = Some(session_minutes(self.login_at, now));
        true
    }
}

/// Whole minutes from login to logout, never negative
pub fn session_minutes(login_at: DateTime<Utc>, logout_at: DateTime<Utc>) -> i64 {
    (logout_at - login_at).num_minutes().max(0)
}
