//! Identity Record Entity
//!
//! One record per (venue, normalised email). It is the durable ledger of
//! whether a visitor is known and verified at a venue. Records are never
//! deleted; only the pending OTP is cleared after use or expiry.

use chrono::{DateTime, Utc};
use kernel::id::{IdentityId, VenueId};
use platform::secret_hash::HashedSecret;

use crate::domain::gateway::FederatedIdentity;
use crate::domain::value_object::{AuthMethod, Email};

/// A code waiting to be verified
///
/// Hash and expiry live together so one can never be set without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
    pub hash: HashedSecret,
    pub expires_at: DateTime<Utc>,
}

/// Where a record stands in the verification flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Unverified,
    OtpPending,
    Verified,
}

#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub identity_id: IdentityId,
    pub venue_id: VenueId,
    pub email: Email,
    /// Federated provider subject (`sub`)
    pub provider_subject: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub pending_code: Option<PendingCode>,
    pub otp_request_count: u32,
    pub otp_window_start: Option<DateTime<Utc>>,
    pub otp_last_sent_at: Option<DateTime<Utc>>,
    pub visit_count: u32,
    pub first_visit_at: Option<DateTime<Utc>>,
    pub last_visit_at: Option<DateTime<Utc>>,
    pub last_ip: Option<String>,
    pub last_user_agent: Option<String>,
    pub auth_method: AuthMethod,
    /// Optimistic concurrency token, bumped on every stored update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
    /// Fresh, unverified record for an OTP visitor
    pub fn new(venue_id: VenueId, email: Email, now: DateTime<Utc>) -> Self {
        Self {
            identity_id: IdentityId::new(),
            venue_id,
            email,
            provider_subject: None,
            first_name: None,
            last_name: None,
            avatar_url: None,
            is_verified: false,
            verified_at: None,
            pending_code: None,
            otp_request_count: 0,
            otp_window_start: None,
            otp_last_sent_at: None,
            visit_count: 0,
            first_visit_at: None,
            last_visit_at: None,
            last_ip: None,
            last_user_agent: None,
            auth_method: AuthMethod::Email,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record for a visitor whose first contact is a federated sign-in
    pub fn new_federated(
        venue_id: VenueId,
        email: Email,
        profile: &FederatedIdentity,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::new(venue_id, email, now);
        record.auth_method = AuthMethod::Google;
        record.apply_profile(profile);
        record
    }

    pub fn state(&self, now: DateTime<Utc>) -> VerificationState {
        if self.is_verified {
            return VerificationState::Verified;
        }
        match &self.pending_code {
            Some(pending) if now <= pending.expires_at => VerificationState::OtpPending,
            _ => VerificationState::Unverified,
        }
    }

    pub fn set_pending_code(&mut self, hash: HashedSecret, expires_at: DateTime<Utc>) {
        self.pending_code = Some(PendingCode { hash, expires_at });
    }

    pub fn clear_pending_code(&mut self) {
        self.pending_code = None;
    }

    /// Move into `verified` and count the visit
    ///
    /// The verified flag only ever goes from false to true.
    pub fn mark_verified(&mut self, method: AuthMethod, now: DateTime<Utc>) {
        self.is_verified = true;
        self.verified_at = Some(now);
        self.auth_method = method;
        self.visit_count = self.visit_count.saturating_add(1);
        if self.first_visit_at.is_none() {
            self.first_visit_at = Some(now);
        }
        self.last_visit_at = Some(now);
        self.updated_at = now;
    }

    /// Copy profile fields from a federated assertion
    ///
    /// Missing fields keep their previous value.
    pub fn apply_profile(&mut self, profile: &FederatedIdentity) {
        self.provider_subject = Some(profile.subject.clone());
        if profile.given_name.is_some() {
            self.first_name = profile.given_name.clone();
        }
        if profile.family_name.is_some() {
            self.last_name = profile.family_name.clone();
        }
        if profile.picture.is_some() {
            self.avatar_url = profile.picture.clone();
        }
    }

    pub fn touch_client(&mut self, ip: Option<String>, user_agent: Option<String>) {
        if ip.is_some() {
            self.last_ip = ip;
        }
        if user_agent.is_some() {
            self.last_user_agent = user_agent;
        }
    }

    /// First verified visit at this venue
    pub fn is_first_visit(&self) -> bool {
        self.visit_count <= 1
    }

    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}
