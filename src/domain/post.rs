use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of content a published post carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    News,
    Quote,
    Joke,
    PriceFallback,
    Manual,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::News => "news",
            ContentType::Quote => "quote",
            ContentType::Joke => "joke",
            ContentType::PriceFallback => "price_fallback",
            ContentType::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "news" => Some(ContentType::News),
            "quote" => Some(ContentType::Quote),
            "joke" => Some(ContentType::Joke),
            "price_fallback" => Some(ContentType::PriceFallback),
            "manual" => Some(ContentType::Manual),
            _ => None,
        }
    }
}

impl From<crate::domain::ContentKind> for ContentType {
    fn from(kind: crate::domain::ContentKind) -> Self {
        match kind {
            crate::domain::ContentKind::Quote => ContentType::Quote,
            crate::domain::ContentKind::Joke => ContentType::Joke,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A published message, logged once per successful publish cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Option<i64>,
    /// Platform-assigned id of the published post
    pub tweet_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub price_change_pct: f64,
    pub content_type: ContentType,
    pub likes: i64,
    pub retweets: i64,
    pub engagement_last_checked: Option<DateTime<Utc>>,
}
