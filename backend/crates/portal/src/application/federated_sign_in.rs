//! Federated Sign-In Use Case
//!
//! Connects a visitor on the strength of a third-party ID token. The
//! provider has already attested the email, so there is no OTP step.

use std::sync::Arc;

use kernel::id::VenueId;
use platform::clock::Clock;

use crate::application::completion::{
    CompleteVerification, CompletionContext, VerificationOutcome,
};
use crate::application::config::PortalConfig;
use crate::application::identity_writer::{Transition, write_identity};
use crate::application::venue_access::require_active_venue;
use crate::domain::entity::IdentityRecord;
use crate::domain::gateway::{FederatedIdentity, GatewayError, IdentityVerifier};
use crate::domain::repository::PortalStore;
use crate::domain::value_object::{AuthMethod, Email};
use crate::error::{PortalError, PortalResult};

/// Federated sign-in input
pub struct FederatedSignInInput {
    pub venue_id: VenueId,
    /// Provider ID token
    pub assertion: String,
}

/// Federated sign-in output
#[derive(Debug)]
pub struct FederatedSignInOutput {
    pub email: Email,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    /// No record existed for this visitor at this venue
    pub is_new_user: bool,
    pub outcome: VerificationOutcome,
}

pub struct FederatedSignInUseCase<R: PortalStore, V: IdentityVerifier> {
    repo: Arc<R>,
    verifier: Arc<V>,
    clock: Arc<dyn Clock>,
    config: Arc<PortalConfig>,
    completion: CompleteVerification<R>,
}

impl<R: PortalStore, V: IdentityVerifier> FederatedSignInUseCase<R, V> {
    pub fn new(
        repo: Arc<R>,
        verifier: Arc<V>,
        clock: Arc<dyn Clock>,
        config: Arc<PortalConfig>,
        completion: CompleteVerification<R>,
    ) -> Self {
        Self {
            repo,
            verifier,
            clock,
            config,
            completion,
        }
    }

    pub async fn execute(
        &self,
        input: FederatedSignInInput,
        ctx: CompletionContext,
    ) -> PortalResult<FederatedSignInOutput> {
        let venue = require_active_venue(self.repo.as_ref(), &input.venue_id).await?;

        let profile = self.verify_assertion(&input.assertion).await?;
        if !profile.email_verified {
            tracing::warn!(venue_id = %venue.venue_id, "Federated email not verified by provider");
            return Err(PortalError::InvalidAssertion);
        }
        let email = Email::new(profile.email.as_str()).map_err(|_| PortalError::InvalidAssertion)?;
        let now = self.clock.now();

        let (record, is_new_user) = write_identity(
            self.repo.as_ref(),
            &venue.venue_id,
            &email,
            |current| {
                let is_new = current.is_none();
                let mut record = match current {
                    Some(mut existing) => {
                        existing.apply_profile(&profile);
                        existing
                    }
                    None => IdentityRecord::new_federated(venue.venue_id, email.clone(), &profile, now),
                };
                // a pending email code is moot once the provider vouches
                record.clear_pending_code();
                record.mark_verified(AuthMethod::Google, now);
                record.touch_client(ctx.client.ip_string(), ctx.client.user_agent.clone());
                Ok((record, Transition::Commit(is_new)))
            },
        )
        .await?;

        let name = record.display_name();
        let avatar_url = record.avatar_url.clone();
        let outcome = self.completion.complete(&venue, &record, ctx);

        Ok(FederatedSignInOutput {
            email: record.email,
            name,
            avatar_url,
            is_new_user,
            outcome,
        })
    }

    /// Verify under the configured deadline; every failure is `InvalidAssertion`
    async fn verify_assertion(&self, assertion: &str) -> PortalResult<FederatedIdentity> {
        let federated = &self.config.federated;
        let result = tokio::time::timeout(
            federated.timeout,
            self.verifier.verify(assertion, &federated.client_id),
        )
        .await
        .unwrap_or(Err(GatewayError::Timeout));

        result.map_err(|e| {
            tracing::warn!(error = %e, "Federated assertion rejected");
            PortalError::InvalidAssertion
        })
    }
}
