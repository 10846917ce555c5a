//! Application Configuration
//!
//! Configuration for the portal application layer.

use std::time::Duration;

use kernel::id::VenueId;
use platform::crypto::digest_eq;
use platform::rate_limit::RateWindow;
use platform::secret_hash::HashParams;

use crate::domain::otp::OtpPolicy;

/// Google's published issuers for ID tokens
pub const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// Google's JWKS endpoint
pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Email OTP settings
#[derive(Debug, Clone)]
pub struct OtpSettings {
    pub digits: u32,
    pub ttl: Duration,
    pub max_requests: u32,
    pub window: Duration,
    pub resend_cooldown: Duration,
    pub hash_params: HashParams,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            digits: 6,
            ttl: Duration::from_secs(10 * 60),         // 10 minutes
            max_requests: 3,
            window: Duration::from_secs(60 * 60),      // 1 hour
            resend_cooldown: Duration::from_secs(60),
            hash_params: HashParams::default(),
        }
    }
}

/// Federated (Google) sign-in settings
#[derive(Debug, Clone)]
pub struct FederatedSettings {
    /// OAuth client id; the expected `aud` of every ID token
    pub client_id: String,
    pub issuers: Vec<String>,
    pub jwks_url: String,
    /// Upper bound for a whole verification, key fetch included
    pub timeout: Duration,
    pub key_cache_ttl: Duration,
}

impl Default for FederatedSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            timeout: Duration::from_secs(5),
            key_cache_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// What a compliance export credential may read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    AllVenues,
    Venue(VenueId),
}

/// Configured compliance export credentials
///
/// Parsed from `token=venueId` pairs (`*` for every venue). Tokens are
/// matched exactly, in constant time.
#[derive(Clone, Default)]
pub struct ExportCredentials {
    entries: Vec<(String, ExportScope)>,
}

impl ExportCredentials {
    pub fn new(entries: Vec<(String, ExportScope)>) -> Self {
        Self { entries }
    }

    /// Parse `token=venueId|*` pairs separated by commas
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (token, scope) = pair
                .split_once('=')
                .ok_or_else(|| format!("Expected token=venueId, got '{}'", mask(pair)))?;
            let token = token.trim();
            if token.is_empty() {
                return Err("Export token cannot be empty".to_string());
            }
            let scope = match scope.trim() {
                "*" => ExportScope::AllVenues,
                venue => ExportScope::Venue(
                    venue
                        .parse()
                        .map_err(|_| format!("Invalid venue id '{}' for export token", venue))?,
                ),
            };
            entries.push((token.to_string(), scope));
        }
        Ok(Self { entries })
    }

    /// Whether `token` may export `venue_id`'s log
    pub fn authorizes(&self, token: &str, venue_id: &VenueId) -> bool {
        let mut allowed = false;
        // every entry is compared so timing does not reveal which matched
        for (configured, scope) in &self.entries {
            let matches = digest_eq(configured, token);
            let in_scope = match scope {
                ExportScope::AllVenues => true,
                ExportScope::Venue(id) => id == venue_id,
            };
            allowed |= matches && in_scope;
        }
        allowed
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ExportCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCredentials")
            .field("count", &self.entries.len())
            .finish()
    }
}

fn mask(s: &str) -> String {
    let visible: String = s.chars().take(4).collect();
    format!("{}***", visible)
}

/// Portal application configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub otp: OtpSettings,
    /// Window in which a second like from the same source is dropped
    pub like_dedup_window: Duration,
    /// Compliance log retention horizon
    pub compliance_retention: Duration,
    /// Post-connect redirect when the venue has none configured
    pub default_redirect_url: String,
    /// Click target when neither the ad nor the venue has one
    pub click_fallback_url: String,
    pub federated: FederatedSettings,
    pub export_credentials: ExportCredentials,
    /// Maximum entries returned by one compliance export
    pub export_page_limit: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            otp: OtpSettings::default(),
            like_dedup_window: Duration::from_secs(60),
            compliance_retention: Duration::from_secs(365 * 24 * 3600), // 365 days
            default_redirect_url: "https://www.google.com".to_string(),
            click_fallback_url: "https://www.google.com".to_string(),
            federated: FederatedSettings::default(),
            export_credentials: ExportCredentials::default(),
            export_page_limit: 1000,
        }
    }
}

impl PortalConfig {
    /// Create config for development (cheap hashing, local redirects)
    pub fn development() -> Self {
        Self {
            otp: OtpSettings {
                hash_params: HashParams::minimal(),
                ..OtpSettings::default()
            },
            default_redirect_url: "http://localhost:3000/connected".to_string(),
            click_fallback_url: "http://localhost:3000".to_string(),
            ..Default::default()
        }
    }

    pub fn otp_policy(&self) -> OtpPolicy {
        OtpPolicy {
            digits: self.otp.digits,
            ttl: to_delta(self.otp.ttl),
            window: RateWindow::new(self.otp.max_requests, to_delta(self.otp.window)),
            cooldown: to_delta(self.otp.resend_cooldown),
        }
    }

    pub fn like_dedup_window_delta(&self) -> chrono::Duration {
        to_delta(self.like_dedup_window)
    }

    pub fn compliance_retention_delta(&self) -> chrono::Duration {
        to_delta(self.compliance_retention)
    }

    /// OTP lifetime in whole minutes, for the email body
    pub fn otp_expiry_minutes(&self) -> u64 {
        self.otp.ttl.as_secs().div_ceil(60)
    }
}

fn to_delta(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}
