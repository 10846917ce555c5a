//! HTTP Handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, header};
use kernel::id::Id;
use platform::background::BackgroundTasks;
use platform::client::{ClientContext, MAX_USER_AGENT_LEN, extract_client_context};
use platform::clock::Clock;
use platform::secret_hash::SecretHasher;

use crate::application::{
    CheckStatusUseCase, CompleteVerification, CompletionContext, ComplianceLogger,
    FederatedSignInInput, FederatedSignInUseCase, InteractionTracker, PortalConfig,
    RecordInteractionInput, RequestOtpInput, RequestOtpUseCase, VerifyOtpInput, VerifyOtpUseCase,
};
use crate::domain::gateway::{CodeMailer, IdentityVerifier};
use crate::domain::otp::OtpEngine;
use crate::domain::repository::PortalStore;
use crate::domain::value_object::{Email, InteractionKind, MacAddress, SessionId};
use crate::error::{PortalError, PortalResult};
use crate::presentation::dto::{
    ComplianceEntryDto, ComplianceExportQuery, ComplianceExportResponse, FederatedRequest,
    FederatedResponse, InteractionRequest, InteractionResponse, LogoutRequest, LogoutResponse,
    RequestOtpRequest, RequestOtpResponse, StatusQuery, StatusResponse, VerifyOtpRequest,
    VerifyOtpResponse,
};

/// Shared state for portal handlers
pub struct PortalAppState<R, M, V> {
    pub repo: Arc<R>,
    pub mailer: Arc<M>,
    pub verifier: Arc<V>,
    pub engine: Arc<OtpEngine>,
    pub clock: Arc<dyn Clock>,
    pub tasks: BackgroundTasks,
    pub config: Arc<PortalConfig>,
}

impl<R, M, V> Clone for PortalAppState<R, M, V> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            mailer: self.mailer.clone(),
            verifier: self.verifier.clone(),
            engine: self.engine.clone(),
            clock: self.clock.clone(),
            tasks: self.tasks.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R, M, V> PortalAppState<R, M, V>
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    pub fn new(
        repo: R,
        mailer: M,
        verifier: V,
        clock: Arc<dyn Clock>,
        tasks: BackgroundTasks,
        config: PortalConfig,
    ) -> PortalResult<Self> {
        let hasher = SecretHasher::new(config.otp.hash_params)
            .map_err(|e| PortalError::Internal(e.to_string()))?;
        let engine = OtpEngine::new(config.otp_policy(), hasher);

        Ok(Self {
            repo: Arc::new(repo),
            mailer: Arc::new(mailer),
            verifier: Arc::new(verifier),
            engine: Arc::new(engine),
            clock,
            tasks,
            config: Arc::new(config),
        })
    }

    fn completion(&self) -> CompleteVerification<R> {
        CompleteVerification::new(
            self.repo.clone(),
            self.tasks.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }
}

// ============================================================================
// Request helpers
// ============================================================================

fn parse_id<T>(raw: &str, field: &str) -> PortalResult<Id<T>> {
    raw.trim()
        .parse()
        .map_err(|_| PortalError::InvalidRequest(format!("Invalid {}", field)))
}

/// Client context, with a body-supplied device descriptor taking precedence
fn client_context(
    headers: &HeaderMap,
    addr: SocketAddr,
    device_descriptor: Option<String>,
) -> ClientContext {
    let mut client = extract_client_context(headers, Some(addr.ip()));
    if let Some(descriptor) = device_descriptor
        .map(|d| d.trim().chars().take(MAX_USER_AGENT_LEN).collect::<String>())
        .filter(|d| !d.is_empty())
    {
        client.user_agent = Some(descriptor);
    }
    client
}

fn completion_context(
    client: ClientContext,
    session_id: Option<String>,
    mac_address: Option<String>,
) -> PortalResult<CompletionContext> {
    let session_id = SessionId::parse_optional(session_id)?;
    let mac_address = match mac_address.filter(|m| !m.trim().is_empty()) {
        Some(raw) => Some(MacAddress::new(raw)?),
        None => None,
    };
    Ok(CompletionContext {
        client,
        session_id,
        mac_address,
    })
}

// ============================================================================
// Email OTP
// ============================================================================

/// POST /api/portal/otp/request
pub async fn request_otp<R, M, V>(
    State(state): State<PortalAppState<R, M, V>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RequestOtpRequest>,
) -> PortalResult<Json<RequestOtpResponse>>
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    let client = client_context(&headers, addr, req.device_descriptor);
    let input = RequestOtpInput {
        venue_id: parse_id(&req.venue_id, "venueId")?,
        email: req.email,
    };

    let use_case = RequestOtpUseCase::new(
        state.repo.clone(),
        state.mailer.clone(),
        state.engine.clone(),
        state.clock.clone(),
        state.config.clone(),
    );
    let output = use_case.execute(input, &client).await?;

    Ok(Json(RequestOtpResponse {
        success: true,
        message: output.message,
        expires_in: output.expires_in,
    }))
}

/// POST /api/portal/otp/verify
pub async fn verify_otp<R, M, V>(
    State(state): State<PortalAppState<R, M, V>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<VerifyOtpRequest>,
) -> PortalResult<Json<VerifyOtpResponse>>
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    let client = client_context(&headers, addr, req.device_descriptor);
    let ctx = completion_context(client, req.session_id, req.mac_address)?;
    let input = VerifyOtpInput {
        venue_id: parse_id(&req.venue_id, "venueId")?,
        email: req.email,
        code: req.code,
    };

    let use_case = VerifyOtpUseCase::new(
        state.repo.clone(),
        state.engine.clone(),
        state.clock.clone(),
        state.completion(),
    );
    let outcome = use_case.execute(input, ctx).await?;

    Ok(Json(VerifyOtpResponse {
        success: true,
        message: outcome.message,
        redirect_url: outcome.redirect_url,
        is_new_visitor: outcome.is_new_visitor,
        compliance_entry_id: outcome.compliance_entry_id.to_string(),
    }))
}

// ============================================================================
// Federated
// ============================================================================

/// POST /api/portal/federated
pub async fn federated_sign_in<R, M, V>(
    State(state): State<PortalAppState<R, M, V>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<FederatedRequest>,
) -> PortalResult<Json<FederatedResponse>>
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    let client = client_context(&headers, addr, req.device_descriptor);
    let ctx = completion_context(client, req.session_id, req.mac_address)?;
    let input = FederatedSignInInput {
        venue_id: parse_id(&req.venue_id, "venueId")?,
        assertion: req.credential,
    };

    let use_case = FederatedSignInUseCase::new(
        state.repo.clone(),
        state.verifier.clone(),
        state.clock.clone(),
        state.config.clone(),
        state.completion(),
    );
    let output = use_case.execute(input, ctx).await?;

    Ok(Json(FederatedResponse {
        success: true,
        message: output.outcome.message,
        email: output.email.into(),
        name: output.name,
        avatar_url: output.avatar_url,
        is_new_user: output.is_new_user,
        redirect_url: output.outcome.redirect_url,
        compliance_entry_id: output.outcome.compliance_entry_id.to_string(),
    }))
}

// ============================================================================
// Status
// ============================================================================

/// GET /api/portal/status?venueId=&email=
pub async fn verification_status<R, M, V>(
    State(state): State<PortalAppState<R, M, V>>,
    Query(query): Query<StatusQuery>,
) -> PortalResult<Json<StatusResponse>>
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    let venue_id = parse_id(&query.venue_id, "venueId")?;
    let status = CheckStatusUseCase::new(state.repo.clone())
        .execute(&venue_id, &query.email)
        .await?;

    Ok(Json(StatusResponse {
        success: true,
        is_verified: status.is_verified,
        visit_count: status.visit_count,
        auth_method: status.auth_method,
    }))
}

// ============================================================================
// Interactions
// ============================================================================

/// POST /api/portal/interactions
pub async fn record_interaction<R, M, V>(
    State(state): State<PortalAppState<R, M, V>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<InteractionRequest>,
) -> PortalResult<Json<InteractionResponse>>
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    let client = client_context(&headers, addr, req.device_descriptor);
    let kind = req
        .kind
        .parse::<InteractionKind>()
        .map_err(PortalError::InvalidRequest)?;
    let identity_id = match req.identity_id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(parse_id(raw, "identityId")?),
        None => None,
    };
    let email = match req.email.filter(|e| !e.trim().is_empty()) {
        Some(raw) => Some(Email::new(raw)?),
        None => None,
    };

    let input = RecordInteractionInput {
        ad_id: parse_id(&req.ad_id, "adId")?,
        venue_id: parse_id(&req.venue_id, "venueId")?,
        kind,
        session_id: SessionId::parse_optional(req.session_id)?,
        identity_id,
        email,
    };

    let tracker = InteractionTracker::new(
        state.repo.clone(),
        state.tasks.clone(),
        state.clock.clone(),
        state.config.clone(),
    );
    let output = tracker.record(input, &client).await?;

    Ok(Json(InteractionResponse {
        success: true,
        redirect_url: output.redirect_url,
    }))
}

// ============================================================================
// Compliance
// ============================================================================

/// POST /api/portal/logout
pub async fn logout<R, M, V>(
    State(state): State<PortalAppState<R, M, V>>,
    Json(req): Json<LogoutRequest>,
) -> PortalResult<Json<LogoutResponse>>
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    let entry_id = parse_id(&req.entry_id, "entryId")?;
    let entry = ComplianceLogger::new(state.repo.clone(), state.clock.clone())
        .log_logout(&entry_id)
        .await?;

    Ok(Json(LogoutResponse {
        success: true,
        logout_at: entry.logout_at,
        session_minutes: entry.session_minutes,
    }))
}

/// GET /api/portal/compliance/{venueId}
///
/// Regulator export. Requires `Authorization: Bearer <token>` with a token
/// configured for this venue or for all venues.
pub async fn compliance_export<R, M, V>(
    State(state): State<PortalAppState<R, M, V>>,
    Path(venue_id): Path<String>,
    Query(query): Query<ComplianceExportQuery>,
    headers: HeaderMap,
) -> PortalResult<Json<ComplianceExportResponse>>
where
    R: PortalStore,
    M: CodeMailer + Sync + 'static,
    V: IdentityVerifier + Sync + 'static,
{
    let venue_id = parse_id(&venue_id, "venueId")?;

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(PortalError::Forbidden)?;
    if !state.config.export_credentials.authorizes(token, &venue_id) {
        tracing::warn!(venue_id = %venue_id, "Compliance export refused");
        return Err(PortalError::Forbidden);
    }

    let page_limit = state.config.export_page_limit;
    let limit = query.limit.unwrap_or(page_limit).clamp(1, page_limit.max(1));

    let entries = ComplianceLogger::new(state.repo.clone(), state.clock.clone())
        .list_for_venue(&venue_id, limit)
        .await?;

    tracing::info!(venue_id = %venue_id, count = entries.len(), "Compliance log exported");

    Ok(Json(ComplianceExportResponse {
        success: true,
        venue_id: venue_id.to_string(),
        entries: entries.into_iter().map(ComplianceEntryDto::from).collect(),
    }))
}
