//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::ComplianceEntry;
use crate::domain::value_object::AuthMethod;

// ============================================================================
// Email OTP
// ============================================================================

/// OTP request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpRequest {
    pub venue_id: String,
    pub email: String,
    /// Overrides the User-Agent header
    pub device_descriptor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpResponse {
    pub success: bool,
    pub message: String,
    /// Seconds until the code expires
    pub expires_in: u64,
}

/// OTP verify request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub venue_id: String,
    pub email: String,
    pub code: String,
    pub session_id: Option<String>,
    pub mac_address: Option<String>,
    pub device_descriptor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub redirect_url: String,
    pub is_new_visitor: bool,
    /// Reference for the logout call
    pub compliance_entry_id: String,
}

// ============================================================================
// Federated
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedRequest {
    pub venue_id: String,
    /// Provider ID token
    pub credential: String,
    pub session_id: Option<String>,
    pub mac_address: Option<String>,
    pub device_descriptor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub is_new_user: bool,
    pub redirect_url: String,
    pub compliance_entry_id: String,
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub venue_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub is_verified: bool,
    pub visit_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<AuthMethod>,
}

// ============================================================================
// Interactions
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRequest {
    pub ad_id: String,
    pub venue_id: String,
    /// `view`, `click`, `like`, `share` or `expand`
    pub kind: String,
    pub session_id: Option<String>,
    pub identity_id: Option<String>,
    pub email: Option<String>,
    pub device_descriptor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

// ============================================================================
// Compliance
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub entry_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub success: bool,
    pub logout_at: Option<DateTime<Utc>>,
    pub session_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceExportQuery {
    pub limit: Option<u32>,
}

/// One compliance log row as exported
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceEntryDto {
    pub entry_id: String,
    pub identity_id: String,
    pub mac_address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub login_at: DateTime<Utc>,
    pub logout_at: Option<DateTime<Utc>>,
    pub session_minutes: Option<i64>,
    pub expires_at: DateTime<Utc>,
}

impl From<ComplianceEntry> for ComplianceEntryDto {
    fn from(entry: ComplianceEntry) -> Self {
        Self {
            entry_id: entry.entry_id.to_string(),
            identity_id: entry.identity_id.to_string(),
            mac_address: entry.mac_address.map(String::from),
            email: entry.email.map(String::from),
            phone: entry.phone,
            ip: entry.ip,
            user_agent: entry.user_agent,
            login_at: entry.login_at,
            logout_at: entry.logout_at,
            session_minutes: entry.session_minutes,
            expires_at: entry.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceExportResponse {
    pub success: bool,
    pub venue_id: String,
    pub entries: Vec<ComplianceEntryDto>,
}
