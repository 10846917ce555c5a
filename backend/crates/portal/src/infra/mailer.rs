//! Email Dispatch
//!
//! Code emails go out through an HTTP mail relay. Debug builds without a
//! relay configured fall back to writing the message to the log.

use std::time::Duration;

use serde::Serialize;

use crate::domain::gateway::{CodeMailer, CodeMessage, GatewayError};

/// Relay request body
#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    subject: String,
    text: String,
    tag: String,
}

fn compose(message: &CodeMessage<'_>) -> (String, String) {
    let venue = message.venue_name.unwrap_or("the venue");
    let subject = format!("Your Wi-Fi code for {}", venue);
    let text = format!(
        "Your verification code is {}.\n\nEnter it on the sign-in page to get online at {}. \
         The code expires in {} minute(s). If you did not ask for it, ignore this email.",
        message.code, venue, message.expiry_minutes
    );
    (subject, text)
}

/// Mail relay over HTTPS with a bearer API key
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

impl CodeMailer for HttpMailer {
    async fn send(&self, message: CodeMessage<'_>) -> Result<(), GatewayError> {
        let (subject, text) = compose(&message);
        let body = RelayMessage {
            to: message.to.as_str(),
            subject,
            text,
            tag: message.purpose.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Rejected(status.as_u16()));
        }

        tracing::debug!(
            purpose = %message.purpose,
            domain = message.to.domain(),
            "Code email handed to relay"
        );
        Ok(())
    }
}

/// Writes code emails to the log instead of sending them
///
/// Only compiled into debug builds; the code is logged in clear under
/// the `dev_outbox` target.
#[cfg(debug_assertions)]
#[derive(Debug, Default)]
pub struct LogMailer;

#[cfg(debug_assertions)]
impl CodeMailer for LogMailer {
    async fn send(&self, message: CodeMessage<'_>) -> Result<(), GatewayError> {
        let (subject, _) = compose(&message);
        tracing::debug!(
            target: "dev_outbox",
            to = %message.to,
            code = message.code,
            subject = %subject,
            "Code email (not sent)"
        );
        Ok(())
    }
}

/// Mailer chosen at startup
pub enum ConfiguredMailer {
    Http(HttpMailer),
    #[cfg(debug_assertions)]
    Log(LogMailer),
}

impl CodeMailer for ConfiguredMailer {
    async fn send(&self, message: CodeMessage<'_>) -> Result<(), GatewayError> {
        match self {
            ConfiguredMailer::Http(mailer) => mailer.send(message).await,
            #[cfg(debug_assertions)]
            ConfiguredMailer::Log(mailer) => mailer.send(message).await,
        }
    }
}
