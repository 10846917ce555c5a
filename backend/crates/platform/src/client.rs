//! Client identification utilities
//!
//! Network address and device descriptor of the caller, taken from
//! HTTP headers.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

/// Longest device descriptor kept; longer User-Agent strings are cut
pub const MAX_USER_AGENT_LEN: usize = 512;

/// Who is calling, as far as the request tells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    /// Client IP address (from X-Forwarded-For or direct connection)
    pub ip: Option<IpAddr>,
    /// User-Agent header, used as the device descriptor
    pub user_agent: Option<String>,
}

impl ClientContext {
    pub fn new(ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }

    /// Get IP as string (for database storage)
    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }
}

/// Build the client context from request headers
///
/// A missing User-Agent is not an error; captive-portal probes often
/// omit it.
pub fn extract_client_context(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> ClientContext {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .map(|ua| truncate_chars(ua, MAX_USER_AGENT_LEN));

    ClientContext::new(extract_client_ip(headers, direct_ip), user_agent)
}

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For header first (for reverse proxy setups),
/// then falls back to direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
