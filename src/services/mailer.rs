use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use crate::core::config::Settings;

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Fire-and-forget mail dispatch through an HTTP relay.
///
/// Returns `None` from `from_settings` when no relay is configured, in which
/// case callers log the message content instead of sending it.
#[derive(Debug, Clone)]
pub(crate) struct MailerService {
    client: Client,
    relay_url: String,
    relay_token: String,
    sender: String,
}

impl MailerService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        if !settings.mail().is_configured() {
            return Ok(None);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(settings.mail().timeout_seconds))
            .build()
            .context("Failed to build mail relay HTTP client")?;

        Ok(Some(Self {
            client,
            relay_url: settings.mail().relay_url.trim_end_matches('/').to_string(),
            relay_token: settings.mail().relay_token.clone(),
            sender: settings.mail().sender.clone(),
        }))
    }

    pub(crate) async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let message = OutboundMessage {
            from: &self.sender,
            to: recipient,
            subject,
            text: body,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.relay_url))
            .bearer_auth(&self.relay_token)
            .json(&message)
            .send()
            .await
            .context("Failed to call mail relay")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("mail relay rejected message (status {status}): {detail}");
        }

        Ok(())
    }
}
