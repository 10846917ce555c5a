//! Portal Router

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use platform::background::BackgroundTasks;
use platform::clock::SystemClock;

use crate::application::config::PortalConfig;
use crate::domain::gateway::{CodeMailer, IdentityVerifier};
use crate::domain::repository::PortalStore;
use crate::error::PortalResult;
use crate::infra::google::{GoogleIdentityVerifier, JwksKeySource};
use crate::infra::mailer::ConfiguredMailer;
use crate::infra::postgres::PgPortalRepository;
use crate::presentation::handlers::{self, PortalAppState};

/// Production verifier type
pub type GoogleVerifier = GoogleIdentityVerifier<JwksKeySource>;

/// Create the Portal router with PostgreSQL repository
pub fn portal_router(
    repo: PgPortalRepository,
    mailer: ConfiguredMailer,
    verifier: GoogleVerifier,
    tasks: BackgroundTasks,
    config: PortalConfig,
) -> PortalResult<Router> {
    let state = PortalAppState::new(
        repo,
        mailer,
        verifier,
        Arc::new(SystemClock),
        tasks,
        config,
    )?;

    Ok(portal_router_generic(state))
}

/// Create a generic Portal router for any repository and gateway implementation
pub fn portal_router_generic<R, M, V>(state: PortalAppState<R, M, V>) -> Router
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    Router::new()
        .route("/otp/request", post(handlers::request_otp::<R, M, V>))
        .route("/otp/verify", post(handlers::verify_otp::<R, M, V>))
        .route("/federated", post(handlers::federated_sign_in::<R, M, V>))
        .route("/status", get(handlers::verification_status::<R, M, V>))
        .route("/interactions", post(handlers::record_interaction::<R, M, V>))
        .route("/logout", post(handlers::logout::<R, M, V>))
        .route(
            "/compliance/{venue_id}",
            get(handlers::compliance_export::<R, M, V>),
        )
        .with_state(state)
}
