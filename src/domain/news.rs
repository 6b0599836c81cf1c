use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment verdict for a news item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        }
    }

    /// Fixed label-to-score mapping used for ranking
    pub fn score(&self) -> f64 {
        match self {
            SentimentLabel::Positive => 0.7,
            SentimentLabel::Neutral => 0.0,
            SentimentLabel::Negative => -0.7,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "neutral" => Some(SentimentLabel::Neutral),
            "negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Significance verdict for a news item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignificanceLabel {
    Low,
    Medium,
    High,
}

impl SignificanceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignificanceLabel::Low => "Low",
            SignificanceLabel::Medium => "Medium",
            SignificanceLabel::High => "High",
        }
    }

    /// Fixed label-to-score mapping used for ranking
    pub fn score(&self) -> f64 {
        match self {
            SignificanceLabel::Low => 0.1,
            SignificanceLabel::Medium => 0.5,
            SignificanceLabel::High => 1.0,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(SignificanceLabel::Low),
            "medium" => Some(SignificanceLabel::Medium),
            "high" => Some(SignificanceLabel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for SignificanceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fetched tweet from the news pipeline, with analysis fields once processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Option<i64>,
    /// Platform tweet id; idempotency key for ingestion
    pub external_tweet_id: String,
    pub author_id: Option<String>,
    pub author_username: Option<String>,
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub metrics: Option<serde_json::Value>,
    pub source: String,
    pub processed: bool,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<SentimentLabel>,
    pub significance_score: Option<f64>,
    pub significance_label: Option<SignificanceLabel>,
    pub summary: Option<String>,
    pub sentiment_source: Option<String>,
    pub llm_analysis: Option<serde_json::Value>,
}

impl NewsItem {
    /// Build a freshly fetched, unprocessed item.
    pub fn fetched(
        external_tweet_id: String,
        author_id: Option<String>,
        author_username: Option<String>,
        text: String,
        published_at: DateTime<Utc>,
        metrics: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: None,
            external_tweet_id,
            author_id,
            author_username,
            text,
            published_at,
            fetched_at: Utc::now(),
            metrics,
            source: "twitter_search".to_string(),
            processed: false,
            sentiment_score: None,
            sentiment_label: None,
            significance_score: None,
            significance_label: None,
            summary: None,
            sentiment_source: None,
            llm_analysis: None,
        }
    }
}

/// Assembled outcome of one LLM analysis pass over a news item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsAnalysis {
    pub significance: Option<SignificanceLabel>,
    pub sentiment: Option<SentimentLabel>,
    pub summary: Option<String>,
    /// Where the sentiment came from ("groq" or one of the fallback reasons)
    pub sentiment_source: String,
    /// Raw JSON payload as returned by the model, when one was parsed
    pub raw: Option<serde_json::Value>,
}

/// Terminal state of one analysis attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Analyzed,
    Failed,
    Timeout,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Analyzed => "analyzed",
            AnalysisStatus::Failed => "analysis_failed",
            AnalysisStatus::Timeout => "analysis_timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_scores_match_fixed_mapping() {
        assert_eq!(SentimentLabel::Positive.score(), 0.7);
        assert_eq!(SentimentLabel::Neutral.score(), 0.0);
        assert_eq!(SentimentLabel::Negative.score(), -0.7);
        assert_eq!(SignificanceLabel::High.score(), 1.0);
        assert_eq!(SignificanceLabel::Medium.score(), 0.5);
        assert_eq!(SignificanceLabel::Low.score(), 0.1);
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(SentimentLabel::parse("positive"), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse(" Negative "), Some(SentimentLabel::Negative));
        assert_eq!(SentimentLabel::parse("bullish"), None);
        assert_eq!(SignificanceLabel::parse("HIGH"), Some(SignificanceLabel::High));
        assert_eq!(SignificanceLabel::parse("unknown"), None);
    }
}
