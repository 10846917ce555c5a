//! Ad Interaction Event Entity
//!
//! Append-only. The only later change is attribution: events recorded
//! before the visitor verified get their identity and email filled in.

use chrono::{DateTime, Utc};
use kernel::id::{AdId, IdentityId, InteractionId, VenueId};

use crate::domain::value_object::{Email, InteractionKind, SessionId};

#[derive(Debug, Clone)]
pub struct InteractionEvent {
    pub interaction_id: InteractionId,
    pub ad_id: AdId,
    pub venue_id: VenueId,
    pub kind: InteractionKind,
    pub identity_id: Option<IdentityId>,
    pub email: Option<Email>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<SessionId>,
    pub created_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(
        ad_id: AdId,
        venue_id: VenueId,
        kind: InteractionKind,
        session_id: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            interaction_id: InteractionId::new(),
            ad_id,
            venue_id,
            kind,
            identity_id: None,
            email: None,
            ip: None,
            user_agent: None,
            session_id,
            created_at: now,
        }
    }

    pub fn with_visitor(mut self, identity_id: Option<IdentityId>, email: Option<Email>) -> Self {
        self.identity_id = identity_id;
        self.email = email;
        self
    }

    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip = ip;
        self.user_agent = user_agent;
        self
    }

    /// Still waiting for the session to be attributed
    pub fn is_anonymous(&self) -> bool {
        self.email.is_none()
    }
}
