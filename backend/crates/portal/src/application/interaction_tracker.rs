//! Interaction Tracker
//!
//! Accepts ad interaction events. The caller waits for the venue and ad
//! checks, the like de-duplication check and click redirect resolution; the
//! append and the counter bump run as a background task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{AdId, IdentityId, VenueId};
use platform::background::BackgroundTasks;
use platform::client::ClientContext;
use platform::clock::Clock;

use crate::application::config::PortalConfig;
use crate::application::venue_access::require_active_venue;
use crate::domain::entity::{Ad, InteractionEvent, Venue};
use crate::domain::repository::PortalStore;
use crate::domain::value_object::{Email, InteractionKind, SessionId};
use crate::error::{PortalError, PortalResult};

/// Record interaction input
pub struct RecordInteractionInput {
    pub ad_id: AdId,
    pub venue_id: VenueId,
    pub kind: InteractionKind,
    pub session_id: Option<SessionId>,
    pub identity_id: Option<IdentityId>,
    pub email: Option<Email>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInteractionOutput {
    /// Only set for clicks
    pub redirect_url: Option<String>,
    /// A like dropped as a repeat
    pub deduplicated: bool,
}

pub struct InteractionTracker<R: PortalStore> {
    repo: Arc<R>,
    tasks: BackgroundTasks,
    clock: Arc<dyn Clock>,
    config: Arc<PortalConfig>,
}

impl<R: PortalStore> InteractionTracker<R> {
    pub fn new(
        repo: Arc<R>,
        tasks: BackgroundTasks,
        clock: Arc<dyn Clock>,
        config: Arc<PortalConfig>,
    ) -> Self {
        Self {
            repo,
            tasks,
            clock,
            config,
        }
    }

    pub async fn record(
        &self,
        input: RecordInteractionInput,
        client: &ClientContext,
    ) -> PortalResult<RecordInteractionOutput> {
        let venue = require_active_venue(self.repo.as_ref(), &input.venue_id).await?;
        let ad = self.require_venue_ad(&input.ad_id, &venue).await?;
        let now = self.clock.now();
        let ip = client.ip_string();

        if input.kind.is_deduplicated()
            && self
                .is_repeat_like(&input.ad_id, ip.as_deref(), input.session_id.as_ref(), now)
                .await
        {
            tracing::debug!(ad_id = %input.ad_id, "Repeat like dropped");
            return Ok(RecordInteractionOutput {
                redirect_url: None,
                deduplicated: true,
            });
        }

        let redirect_url = match input.kind {
            InteractionKind::Click => Some(self.resolve_click_target(&ad, &venue)),
            _ => None,
        };

        let event = InteractionEvent::new(input.ad_id, venue.venue_id, input.kind, input.session_id, now)
            .with_visitor(input.identity_id, input.email)
            .with_client(ip, client.user_agent.clone());

        let repo = self.repo.clone();
        self.tasks.submit("interaction_append", async move {
            repo.append_and_count(&event).await?;
            tracing::debug!(
                ad_id = %event.ad_id,
                kind = %event.kind,
                anonymous = event.is_anonymous(),
                "Interaction recorded"
            );
            Ok::<(), PortalError>(())
        });

        Ok(RecordInteractionOutput {
            redirect_url,
            deduplicated: false,
        })
    }

    /// Fails open: a lookup error counts as "no prior like"
    async fn is_repeat_like(
        &self,
        ad_id: &AdId,
        ip: Option<&str>,
        session_id: Option<&SessionId>,
        now: DateTime<Utc>,
    ) -> bool {
        if ip.is_none() && session_id.is_none() {
            return false;
        }
        let since = now - self.config.like_dedup_window_delta();
        match self
            .repo
            .recent_like_exists(ad_id, ip, session_id, since)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    task = "like_dedup",
                    ad_id = %ad_id,
                    error = %e,
                    "Like de-duplication lookup failed, accepting event"
                );
                false
            }
        }
    }

    /// The ad must exist and be shown by `venue`
    async fn require_venue_ad(&self, ad_id: &AdId, venue: &Venue) -> PortalResult<Ad> {
        match self.repo.find_ad(ad_id).await? {
            Some(ad) if ad.venue_id == venue.venue_id => Ok(ad),
            Some(ad) => {
                tracing::warn!(
                    ad_id = %ad_id,
                    venue_id = %venue.venue_id,
                    owner_venue_id = %ad.venue_id,
                    "Interaction names an ad of another venue"
                );
                Err(PortalError::AdNotFound)
            }
            None => Err(PortalError::AdNotFound),
        }
    }

    /// Ad call-to-action, else venue redirect, else the fallback URL
    fn resolve_click_target(&self, ad: &Ad, venue: &Venue) -> String {
        if let Some(cta) = ad.cta() {
            return cta.to_string();
        }
        venue
            .redirect_target(&self.config.click_fallback_url)
            .to_string()
    }
}
