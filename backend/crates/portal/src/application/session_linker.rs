//! Session-Identity Linker
//!
//! Attributes anonymous interaction events to the identity that later
//! verified in the same browser session. Eventually consistent: events
//! written while a link runs may be picked up by the next one or not at all.

use std::sync::Arc;

use kernel::id::IdentityId;

use crate::domain::entity::InteractionEvent;
use crate::domain::repository::InteractionRepository;
use crate::domain::value_object::{Email, SessionId};
use crate::error::PortalResult;

pub struct SessionLinker<R: InteractionRepository> {
    repo: Arc<R>,
}

impl<R: InteractionRepository> Clone for SessionLinker<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: InteractionRepository> SessionLinker<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Backfill identity and email onto the session's anonymous events
    pub async fn link(
        &self,
        session_id: &SessionId,
        identity_id: &IdentityId,
        email: &Email,
    ) -> PortalResult<u64> {
        let linked = self.repo.link_session(session_id, identity_id, email).await?;

        tracing::info!(
            session_id = %session_id,
            identity_id = %identity_id,
            linked,
            "Session events attributed"
        );
        Ok(linked)
    }

    pub async fn events_for_session(
        &self,
        session_id: &SessionId,
    ) -> PortalResult<Vec<InteractionEvent>> {
        self.repo.events_for_session(session_id).await
    }
}
