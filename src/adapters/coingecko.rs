//! CoinGecko price client with bounded retries and backoff.

use crate::config::CoinGeckoConfig;
use crate::domain::PriceQuote;
use crate::error::{BuzzError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-attempt request deadline
const ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// Source of the current BTC/USD price
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn btc_price(&self) -> Result<PriceQuote>;
}

/// CoinGecko simple-price client
#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    retry_limit: u32,
}

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    bitcoin: BitcoinPrice,
}

#[derive(Debug, Deserialize)]
struct BitcoinPrice {
    usd: f64,
    #[serde(default)]
    usd_24h_change: f64,
}

impl CoinGeckoClient {
    pub fn new(cfg: &CoinGeckoConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(ATTEMPT_TIMEOUT_SECS))
            .build()
            .map_err(BuzzError::Http)?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            retry_limit: cfg.retry_limit.max(1),
        })
    }

    async fn fetch_once(&self) -> Result<PriceQuote> {
        let url = format!(
            "{}/simple/price?ids=bitcoin&vs_currencies=usd&include_24hr_change=true",
            self.base_url
        );
        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await.map_err(BuzzError::Http)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BuzzError::RateLimited("CoinGecko: HTTP 429".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(BuzzError::Provider {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let parsed: SimplePriceResponse = response
            .json()
            .await
            .map_err(|e| BuzzError::Parse(format!("CoinGecko response: {e}")))?;
        Ok(PriceQuote {
            usd: parsed.bitcoin.usd,
            change_24h: parsed.bitcoin.usd_24h_change,
        })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    /// Fetch the current price, retrying transport errors and rate limits
    /// with exponential backoff. Any other provider error is fatal for the
    /// call.
    async fn btc_price(&self) -> Result<PriceQuote> {
        let mut last_err = None;
        for attempt in 0..self.retry_limit {
            match self.fetch_once().await {
                Ok(quote) => {
                    debug!(usd = quote.usd, change = quote.change_24h, "Fetched BTC price");
                    return Ok(quote);
                }
                Err(err) if err.is_transient() && attempt + 1 < self.retry_limit => {
                    let backoff = Duration::from_secs(2u64 << attempt);
                    warn!(
                        attempt = attempt + 1,
                        "Price fetch failed ({err}), retrying in {backoff:?}"
                    );
                    tokio::time::sleep(backoff).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| BuzzError::Internal("price retry loop".to_string())))
    }
}
