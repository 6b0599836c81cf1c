//! Discord webhook notifications
//!
//! Best-effort side channel; a failed delivery never fails the publish
//! cycle, it only produces a warning.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Discord hard limit on message content length
const MAX_CONTENT_CHARS: usize = 2000;
const SEND_TIMEOUT_SECS: u64 = 10;

/// Discord webhook client
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct DiscordMessage<'a> {
    content: &'a str,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { http, webhook_url }
    }

    /// Send a text message to the webhook. Returns delivery success.
    pub async fn send(&self, text: &str) -> bool {
        let content: String = text.chars().take(MAX_CONTENT_CHARS).collect();
        let message = DiscordMessage { content: &content };

        match self
            .http
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                debug!("Discord notification sent");
                true
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!("Discord webhook failed: {} - {}", status, body);
                false
            }
            Err(e) => {
                warn!("Discord request failed: {}", e);
                false
            }
        }
    }
}
