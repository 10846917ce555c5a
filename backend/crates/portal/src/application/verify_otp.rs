//! Verify OTP Use Case
//!
//! Checks a submitted code and, on success, connects the visitor.

use std::sync::Arc;

use kernel::id::VenueId;
use platform::clock::Clock;

use crate::application::completion::{
    CompleteVerification, CompletionContext, VerificationOutcome,
};
use crate::application::identity_writer::{Transition, write_identity};
use crate::application::venue_access::require_active_venue;
use crate::domain::otp::OtpEngine;
use crate::domain::repository::PortalStore;
use crate::domain::value_object::Email;
use crate::error::{PortalError, PortalResult};

/// Verify OTP input
pub struct VerifyOtpInput {
    pub venue_id: VenueId,
    pub email: String,
    pub code: String,
}

pub struct VerifyOtpUseCase<R: PortalStore> {
    repo: Arc<R>,
    engine: Arc<OtpEngine>,
    clock: Arc<dyn Clock>,
    completion: CompleteVerification<R>,
}

impl<R: PortalStore> VerifyOtpUseCase<R> {
    pub fn new(
        repo: Arc<R>,
        engine: Arc<OtpEngine>,
        clock: Arc<dyn Clock>,
        completion: CompleteVerification<R>,
    ) -> Self {
        Self {
            repo,
            engine,
            clock,
            completion,
        }
    }

    pub async fn execute(
        &self,
        input: VerifyOtpInput,
        ctx: CompletionContext,
    ) -> PortalResult<VerificationOutcome> {
        let venue = require_active_venue(self.repo.as_ref(), &input.venue_id).await?;
        let email = Email::new(input.email)?;
        let now = self.clock.now();

        let (record, ()) = write_identity(
            self.repo.as_ref(),
            &venue.venue_id,
            &email,
            |current| {
                let mut record = current.ok_or(PortalError::NoPendingCode)?;
                match self.engine.verify_code(&mut record, &input.code, now) {
                    Ok(()) => {
                        record.touch_client(ctx.client.ip_string(), ctx.client.user_agent.clone());
                        Ok((record, Transition::Commit(())))
                    }
                    // the discarded code has to be stored
                    Err(PortalError::CodeExpired) => {
                        Ok((record, Transition::CommitThenFail(PortalError::CodeExpired)))
                    }
                    Err(e) => Err(e),
                }
            },
        )
        .await?;

        Ok(self.completion.complete(&venue, &record, ctx))
    }
}
