use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two curated content pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Quote,
    Joke,
}

impl ContentKind {
    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Quote => "quotes",
            ContentKind::Joke => "jokes",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Quote => "quote",
            ContentKind::Joke => "joke",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A curated quote or joke
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub text: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub used_count: i64,
    pub last_used: Option<DateTime<Utc>>,
}

/// Content selected for a publish cycle
#[derive(Debug, Clone)]
pub struct PickedContent {
    pub text: String,
    pub kind: ContentKind,
}
