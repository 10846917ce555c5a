//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use anyhow::Context;
use axum::{
    Router, http,
    http::{Method, header},
};
use platform::background::BackgroundTasks;
use platform::clock::SystemClock;
use portal::application::{ComplianceLogger, ExportCredentials};
use portal::infra::{ConfiguredMailer, GoogleIdentityVerifier, HttpMailer, JwksKeySource};
use portal::{PgPortalRepository, PortalConfig, portal_router};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

const MAIL_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,portal=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let repo = PgPortalRepository::new(pool.clone());

    // Startup purge of compliance entries past retention
    // Errors here should not prevent server startup
    let compliance = ComplianceLogger::new(Arc::new(repo.clone()), Arc::new(SystemClock));
    if let Err(e) = compliance.purge_expired().await {
        tracing::warn!(
            error = %e,
            "Compliance log purge failed, continuing anyway"
        );
    }

    let purge_interval = env::var("RETENTION_PURGE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3600);
    tokio::spawn(purge_periodically(
        compliance,
        Duration::from_secs(purge_interval),
    ));

    // Portal configuration
    let config = portal_config()?;
    let mailer = configured_mailer()?;
    let verifier = GoogleIdentityVerifier::new(
        JwksKeySource::from_settings(&config.federated)?,
        config.federated.issuers.clone(),
    );

    let tasks = BackgroundTasks::new();

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest(
            "/api/portal",
            portal_router(repo, mailer, verifier, tasks.clone(), config)?,
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 31113)));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Let pending interaction and compliance writes land
    tasks.wait_idle().await;
    tracing::info!("Server stopped");

    Ok(())
}

fn portal_config() -> anyhow::Result<PortalConfig> {
    let mut config = if cfg!(debug_assertions) {
        PortalConfig::development()
    } else {
        PortalConfig::default()
    };

    match env::var("GOOGLE_CLIENT_ID") {
        Ok(client_id) => config.federated.client_id = client_id,
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("GOOGLE_CLIENT_ID not set, federated sign-in will reject every token");
        }
        Err(_) => anyhow::bail!("GOOGLE_CLIENT_ID must be set in production"),
    }

    if let Ok(url) = env::var("PORTAL_DEFAULT_REDIRECT_URL") {
        config.default_redirect_url = url;
    }
    if let Ok(url) = env::var("PORTAL_CLICK_FALLBACK_URL") {
        config.click_fallback_url = url;
    }

    if let Ok(raw) = env::var("COMPLIANCE_EXPORT_TOKENS") {
        config.export_credentials = ExportCredentials::parse(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid COMPLIANCE_EXPORT_TOKENS: {}", e))?;
    }
    if config.export_credentials.is_empty() {
        tracing::warn!("No compliance export credentials configured, export endpoint is closed");
    }

    Ok(config)
}

fn configured_mailer() -> anyhow::Result<ConfiguredMailer> {
    match (env::var("MAIL_RELAY_URL"), env::var("MAIL_RELAY_TOKEN")) {
        (Ok(url), Ok(token)) => Ok(ConfiguredMailer::Http(HttpMailer::new(
            url,
            token,
            MAIL_RELAY_TIMEOUT,
        )?)),
        #[cfg(debug_assertions)]
        _ => {
            tracing::warn!("MAIL_RELAY_URL not set, codes are written to the dev_outbox log");
            Ok(ConfiguredMailer::Log(portal::infra::mailer::LogMailer))
        }
        #[cfg(not(debug_assertions))]
        _ => anyhow::bail!("MAIL_RELAY_URL and MAIL_RELAY_TOKEN must be set in production"),
    }
}

async fn purge_periodically(
    compliance: ComplianceLogger<PgPortalRepository>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    // the first tick fires immediately and startup already purged
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = compliance.purge_expired().await {
            tracing::warn!(error = %e, "Scheduled compliance purge failed");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
