use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const SESSION_ID_MAX_LENGTH: usize = 128;

/// Client-generated browser session correlation id
///
/// Opaque to the server; only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> AppResult<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(AppError::bad_request("Session id cannot be empty"));
        }
        if trimmed.len() > SESSION_ID_MAX_LENGTH {
            return Err(AppError::bad_request(format!(
                "Session id must be at most {} characters",
                SESSION_ID_MAX_LENGTH
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        {
            return Err(AppError::bad_request("Session id contains invalid characters"));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Blank input means "no session", not an error
    pub fn parse_optional(raw: Option<String>) -> AppResult<Option<Self>> {
        match raw {
            Some(s) if !s.trim().is_empty() => Self::new(s).map(Some),
            _ => Ok(None),
        }
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = AppError;

    fn try_from(value: String) -> AppResult<Self> {
        SessionId::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
