//! Twitter API v2 client: user-context posting, app-only recent search,
//! engagement lookup.

use crate::config::TwitterConfig;
use crate::error::{BuzzError, Result};
use crate::signing::OAuth1Credentials;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/2";
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Posting and engagement surface of the microblog platform
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Publish `text`; returns the platform-assigned post id.
    /// Single attempt, never retried by the client (duplicate risk).
    async fn post_message(&self, text: &str) -> Result<String>;

    async fn get_engagement(&self, tweet_id: &str) -> Result<Engagement>;
}

/// Recent-search surface used by the news fetcher
#[async_trait]
pub trait TweetSearch: Send + Sync {
    async fn search_recent(
        &self,
        query: &str,
        since_id: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<FetchedTweet>>;
}

/// Engagement counters for one post
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: i64,
    pub retweets: i64,
}

/// One tweet returned by recent search, with the author expansion resolved
#[derive(Debug, Clone)]
pub struct FetchedTweet {
    pub id: String,
    pub text: String,
    pub author_id: Option<String>,
    pub author_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub metrics: Option<serde_json::Value>,
}

/// Twitter API v2 client
#[derive(Clone)]
pub struct TwitterClient {
    http: Client,
    base_url: String,
    bearer_token: Option<String>,
    oauth: Option<OAuth1Credentials>,
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Deserialize)]
struct TweetLookupResponse {
    data: LookupTweet,
}

#[derive(Deserialize)]
struct LookupTweet {
    #[serde(default)]
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    retweet_count: i64,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<ApiTweet>,
    #[serde(default)]
    includes: Option<SearchIncludes>,
}

#[derive(Deserialize)]
struct ApiTweet {
    id: String,
    text: String,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    public_metrics: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct SearchIncludes {
    #[serde(default)]
    users: Vec<ApiUser>,
}

#[derive(Deserialize)]
struct ApiUser {
    id: String,
    username: String,
}

impl TwitterClient {
    pub fn from_config(cfg: &TwitterConfig) -> Result<Self> {
        Self::new(cfg, DEFAULT_BASE_URL)
    }

    pub fn new(cfg: &TwitterConfig, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(BuzzError::Http)?;
        let oauth = cfg
            .user_credentials()
            .map(|(key, secret, token, token_secret)| {
                OAuth1Credentials::new(key, secret, token, token_secret)
            });
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: cfg.bearer_token.clone(),
            oauth,
        })
    }

    pub fn can_post(&self) -> bool {
        self.oauth.is_some()
    }

    pub fn can_search(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// Map a non-success response to the error taxonomy. 403 bodies that
    /// mention duplicate content become [`BuzzError::DuplicatePost`].
    async fn error_from_response(response: reqwest::Response) -> BuzzError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(300).collect();
        match status {
            StatusCode::TOO_MANY_REQUESTS => BuzzError::RateLimited("Twitter: HTTP 429".into()),
            StatusCode::UNAUTHORIZED => BuzzError::Auth(format!("Twitter: {snippet}")),
            StatusCode::FORBIDDEN if body.to_lowercase().contains("duplicate") => {
                BuzzError::DuplicatePost(snippet)
            }
            StatusCode::FORBIDDEN => BuzzError::Auth(format!("Twitter: {snippet}")),
            _ => BuzzError::Provider {
                status: status.as_u16(),
                body: snippet,
            },
        }
    }

    fn bearer(&self) -> Result<&str> {
        self.bearer_token
            .as_deref()
            .ok_or_else(|| BuzzError::Auth("TWITTER_BEARER_TOKEN not configured".into()))
    }
}

#[async_trait]
impl SocialClient for TwitterClient {
    async fn post_message(&self, text: &str) -> Result<String> {
        let oauth = self.oauth.as_ref().ok_or_else(|| {
            BuzzError::Auth("Twitter user-context credentials not configured".into())
        })?;

        let url = format!("{}/tweets", self.base_url);
        let authorization = oauth.authorization_header("POST", &url, &[]);

        let response = self
            .http
            .post(&url)
            .header("Authorization", authorization)
            .json(&CreateTweetRequest { text })
            .send()
            .await
            .map_err(BuzzError::Http)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let created: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| BuzzError::Parse(format!("create-tweet response: {e}")))?;
        debug!(tweet_id = %created.data.id, "Posted tweet");
        Ok(created.data.id)
    }

    /// Read public metrics for a post. App-only auth is tried first when a
    /// bearer token is configured; user-context signing is the fallback.
    async fn get_engagement(&self, tweet_id: &str) -> Result<Engagement> {
        let url = format!("{}/tweets/{}", self.base_url, tweet_id);
        let params = [("tweet.fields", "public_metrics")];

        let request = if let Some(bearer) = self.bearer_token.as_deref() {
            self.http.get(&url).bearer_auth(bearer).query(&params)
        } else if let Some(oauth) = &self.oauth {
            let authorization = oauth.authorization_header("GET", &url, &params);
            self.http
                .get(&url)
                .header("Authorization", authorization)
                .query(&params)
        } else {
            return Err(BuzzError::Auth("No Twitter credentials configured".into()));
        };

        let response = request.send().await.map_err(BuzzError::Http)?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let lookup: TweetLookupResponse = response
            .json()
            .await
            .map_err(|e| BuzzError::Parse(format!("tweet lookup response: {e}")))?;
        let metrics = lookup.data.public_metrics.unwrap_or_default();
        Ok(Engagement {
            likes: metrics.like_count,
            retweets: metrics.retweet_count,
        })
    }
}

#[async_trait]
impl TweetSearch for TwitterClient {
    async fn search_recent(
        &self,
        query: &str,
        since_id: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<FetchedTweet>> {
        let bearer = self.bearer()?.to_string();
        let url = format!("{}/tweets/search/recent", self.base_url);

        // Platform bounds for max_results on the recent-search endpoint.
        let capped = max_results.clamp(5, 100).to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("query", query),
            ("max_results", &capped),
            ("tweet.fields", "created_at,public_metrics,author_id"),
            ("expansions", "author_id"),
            ("user.fields", "username"),
        ];
        if let Some(since) = since_id {
            params.push(("since_id", since));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(bearer)
            .query(&params)
            .send()
            .await
            .map_err(BuzzError::Http)?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let page: SearchResponse = response
            .json()
            .await
            .map_err(|e| BuzzError::Parse(format!("search response: {e}")))?;

        let users: HashMap<String, String> = page
            .includes
            .map(|inc| {
                inc.users
                    .into_iter()
                    .map(|u| (u.id, u.username))
                    .collect()
            })
            .unwrap_or_default();

        let now = Utc::now();
        let tweets = page
            .data
            .into_iter()
            .map(|t| {
                let author_username = t
                    .author_id
                    .as_ref()
                    .and_then(|id| users.get(id))
                    .cloned();
                FetchedTweet {
                    id: t.id,
                    text: t.text,
                    author_id: t.author_id,
                    author_username,
                    created_at: t.created_at.unwrap_or(now),
                    metrics: t.public_metrics,
                }
            })
            .collect();
        Ok(tweets)
    }
}
