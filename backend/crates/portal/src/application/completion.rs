//! Verification Completion
//!
//! Runs after an identity record has been committed as verified: resolves
//! the post-connect redirect, hands session linking and the compliance login
//! to background tasks, and builds the welcome payload.

use std::sync::Arc;

use kernel::id::ComplianceEntryId;
use platform::background::BackgroundTasks;
use platform::client::ClientContext;
use platform::clock::Clock;

use crate::application::compliance_logger::ComplianceLogger;
use crate::application::config::PortalConfig;
use crate::application::session_linker::SessionLinker;
use crate::domain::entity::{ComplianceEntry, IdentityRecord, Venue};
use crate::domain::repository::PortalStore;
use crate::domain::value_object::{MacAddress, SessionId};

/// Caller context carried into the completion step
#[derive(Debug, Clone, Default)]
pub struct CompletionContext {
    pub client: ClientContext,
    pub session_id: Option<SessionId>,
    pub mac_address: Option<MacAddress>,
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub redirect_url: String,
    pub message: String,
    pub is_new_visitor: bool,
    /// Id the compliance entry is written under, for a later logout
    pub compliance_entry_id: ComplianceEntryId,
}

pub struct CompleteVerification<R: PortalStore> {
    repo: Arc<R>,
    tasks: BackgroundTasks,
    clock: Arc<dyn Clock>,
    config: Arc<PortalConfig>,
}

impl<R: PortalStore> CompleteVerification<R> {
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

    /// Must only be called once `record` is persisted as verified
    pub fn complete(
        &self,
        venue: &Venue,
        record: &IdentityRecord,
        ctx: CompletionContext,
    ) -> VerificationOutcome {
        let redirect_url = venue
            .redirect_target(&self.config.default_redirect_url)
            .to_string();

        if let Some(session_id) = ctx.session_id {
            let linker = SessionLinker::new(self.repo.clone());
            let identity_id = record.identity_id;
            let email = record.email.clone();
            self.tasks.submit("session_link", async move {
                linker.link(&session_id, &identity_id, &email).await.map(|_| ())
            });
        }

        let entry_id = ComplianceEntryId::new();
        let mut entry = ComplianceEntry::new_login(
            entry_id,
            venue.venue_id,
            record.identity_id,
            self.clock.now(),
            self.config.compliance_retention_delta(),
        );
        entry.email = Some(record.email.clone());
        entry.mac_address = ctx.mac_address;
        entry.ip = ctx.client.ip_string();
        entry.user_agent = ctx.client.user_agent;

        let logger = ComplianceLogger::new(self.repo.clone(), self.clock.clone());
        self.tasks
            .submit("compliance_login", async move { logger.log_login(entry).await });

        let is_new_visitor = record.is_first_visit();
        let message = welcome_message(venue, record, is_new_visitor);

        tracing::info!(
            venue_id = %venue.venue_id,
            identity_id = %record.identity_id,
            auth_method = %record.auth_method,
            visit_count = record.visit_count,
            "Visitor verified"
        );

        VerificationOutcome {
            redirect_url,
            message,
            is_new_visitor,
            compliance_entry_id: entry_id,
        }
    }
}

fn welcome_message(venue: &Venue, record: &IdentityRecord, is_new_visitor: bool) -> String {
    let name = record
        .first_name
        .as_deref()
        .map(|n| format!(", {}", n))
        .unwrap_or_default();
    if is_new_visitor {
        format!("Welcome to {}{}! You are now connected.", venue.name, name)
    } else {
        format!(
            "Welcome back{}! This is visit number {} at {}.",
            name, record.visit_count, venue.name
        )
    }
}
