//! Telegram Bot API notifications
//!
//! Best-effort side channel mirroring the Discord poster: delivery failures
//! are logged and swallowed.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SEND_TIMEOUT_SECS: u64 = 10;

/// Telegram bot client for a single chat
#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            http,
            bot_token,
            chat_id,
        }
    }

    /// Send a text message via the Bot API. Returns delivery success.
    pub async fn send(&self, text: &str) -> bool {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        match self.http.post(&url).json(&request).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<SendMessageResponse>().await
            {
                Ok(body) if body.ok => {
                    debug!(chat_id = %self.chat_id, "Telegram notification sent");
                    true
                }
                Ok(body) => {
                    warn!(
                        "Telegram API error: {}",
                        body.description.unwrap_or_else(|| "unknown".into())
                    );
                    false
                }
                Err(e) => {
                    warn!("Telegram response parse failed: {}", e);
                    false
                }
            },
            Ok(resp) => {
                warn!("Telegram send failed: HTTP {}", resp.status());
                false
            }
            Err(e) => {
                warn!("Telegram request failed: {}", e);
                false
            }
        }
    }
}
