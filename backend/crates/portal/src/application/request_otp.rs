//! Request OTP Use Case
//!
//! Issues an email one-time code for a visitor at a venue.

use std::sync::Arc;

use kernel::id::VenueId;
use platform::client::ClientContext;
use platform::clock::Clock;

use crate::application::config::PortalConfig;
use crate::application::identity_writer::{Transition, write_identity};
use crate::application::venue_access::require_active_venue;
use crate::domain::entity::IdentityRecord;
use crate::domain::gateway::{CodeMailer, CodeMessage, CodePurpose};
use crate::domain::otp::OtpEngine;
use crate::domain::repository::{IdentityRepository, VenueDirectory};
use crate::domain::value_object::Email;
use crate::error::{PortalError, PortalResult};

/// Request OTP input
pub struct RequestOtpInput {
    pub venue_id: VenueId,
    pub email: String,
}

/// Request OTP output
#[derive(Debug)]
pub struct RequestOtpOutput {
    /// Seconds until the code expires
    pub expires_in: u64,
    pub message: String,
}

pub struct RequestOtpUseCase<R, M>
where
    R: VenueDirectory + IdentityRepository,
    M: CodeMailer,
{
    repo: Arc<R>,
    mailer: Arc<M>,
    engine: Arc<OtpEngine>,
    clock: Arc<dyn Clock>,
    config: Arc<PortalConfig>,
}

impl<R, M> RequestOtpUseCase<R, M>
where
    R: VenueDirectory + IdentityRepository,
    M: CodeMailer,
{
    pub fn new(
        repo: Arc<R>,
        mailer: Arc<M>,
        engine: Arc<OtpEngine>,
        clock: Arc<dyn Clock>,
        config: Arc<PortalConfig>,
    ) -> Self {
        Self {
            repo,
            mailer,
            engine,
            clock,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: RequestOtpInput,
        client: &ClientContext,
    ) -> PortalResult<RequestOtpOutput> {
        let venue = require_active_venue(self.repo.as_ref(), &input.venue_id).await?;
        let email = Email::new(input.email)?;
        let now = self.clock.now();

        let (record, issued) = write_identity(
            self.repo.as_ref(),
            &venue.venue_id,
            &email,
            |current| {
                let mut record = current
                    .unwrap_or_else(|| IdentityRecord::new(venue.venue_id, email.clone(), now));
                record.touch_client(client.ip_string(), client.user_agent.clone());
                let issued = self.engine.request_code(&mut record, now)?;
                Ok((record, Transition::Commit(issued)))
            },
        )
        .await?;

        let message = CodeMessage {
            to: &email,
            code: issued.code.expose(),
            purpose: CodePurpose::WifiVerification,
            venue_name: Some(venue.name.as_str()),
            expiry_minutes: self.config.otp_expiry_minutes(),
        };

        if let Err(e) = self.mailer.send(message).await {
            tracing::warn!(
                venue_id = %venue.venue_id,
                identity_id = %record.identity_id,
                error = %e,
                "OTP email delivery failed"
            );
            self.discard_pending_code(&venue.venue_id, &email).await;
            return Err(PortalError::DeliveryFailed);
        }

        tracing::info!(
            venue_id = %venue.venue_id,
            identity_id = %record.identity_id,
            request_count = record.otp_request_count,
            "OTP issued"
        );

        Ok(RequestOtpOutput {
            expires_in: issued.expires_in_secs(now),
            message: "Verification code sent. Please check your email.".to_string(),
        })
    }

    /// Drop an undelivered code; the request still counts against the quota
    async fn discard_pending_code(&self, venue_id: &VenueId, email: &Email) {
        let now = self.clock.now();
        let result = write_identity(self.repo.as_ref(), venue_id, email, |current| {
            let Some(mut record) = current else {
                return Err(PortalError::NoPendingCode);
            };
            record.clear_pending_code();
            record.updated_at = now;
            Ok((record, Transition::Commit(())))
        })
        .await;

        if let Err(e) = result {
            tracing::warn!(
                venue_id = %venue_id,
                error = %e,
                "Failed to discard undelivered OTP"
            );
        }
    }
}
