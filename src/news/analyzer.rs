//! News analysis: run unprocessed tweets through the LLM, with a lexicon
//! sentiment fallback, and write structured verdicts back to the store.

use crate::adapters::GroqClient;
use crate::domain::{AnalysisStatus, NewsAnalysis, SentimentLabel, SignificanceLabel};
use crate::error::Result;
use crate::news::vader::SentimentIntensityAnalyzer;
use crate::store::Store;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Sentiment came straight from the LLM verdict
pub const SOURCE_GROQ: &str = "groq";
/// LLM JSON parsed but carried no sentiment
pub const SOURCE_VADER_NO_SENTIMENT: &str = "vader_fallback_groq_no_sentiment";
/// No JSON object could be located in the LLM response
pub const SOURCE_VADER_JSON_ERROR: &str = "vader_fallback_groq_json_error";
/// A JSON object was located but failed to decode
pub const SOURCE_VADER_JSON_DECODE_ERROR: &str = "vader_fallback_groq_json_decode_error";
/// The LLM call itself failed
pub const SOURCE_VADER_API_ERROR: &str = "vader_fallback_groq_api_error";
/// No LLM client is configured at all
pub const SOURCE_VADER_NO_CLIENT: &str = "vader_fallback_no_groq_client";

/// Concurrent in-flight LLM calls per cycle
const MAX_CONCURRENT_ANALYSES: usize = 8;

const ANALYSIS_PROMPT: &str = r#"Analyze the provided tweet text about Bitcoin. Determine its significance for Bitcoin news and its overall sentiment towards Bitcoin's impact or price.

Provide your analysis ONLY in JSON format with the following keys:
- "significance": String. Rate the news significance as "Low", "Medium", or "High".
    - "High" for major events (regulation, adoption, large price swings >5%, exchange issues, major project launches).
    - "Medium" for notable updates (partnerships, minor technical updates, analyst predictions from reputable sources).
    - "Low" for generic price commentary, memes, minor news, or personal opinions without broad impact.
- "sentiment": String. Rate the sentiment towards Bitcoin's impact/price as "Positive", "Negative", or "Neutral".
- "summary": String. Provide a concise one-sentence summary (max 200 chars) of the key information.

Tweet text:
"""
{text}
"""

JSON analysis:
"#;

/// Outcome of one analysis cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeStats {
    pub analyzed: usize,
    pub timed_out: usize,
    pub failed: usize,
}

/// Scores unprocessed news items in bounded concurrent batches
pub struct NewsAnalyzer {
    store: Arc<dyn Store>,
    groq: Option<GroqClient>,
    vader: Arc<SentimentIntensityAnalyzer>,
    batch_size: u32,
    cycle_timeout: Duration,
}

impl NewsAnalyzer {
    pub fn new(
        store: Arc<dyn Store>,
        groq: Option<GroqClient>,
        batch_size: u32,
        cycle_timeout: Duration,
    ) -> Self {
        if groq.is_none() {
            warn!("No LLM client configured; news analysis will use the lexicon fallback only");
        }
        Self {
            store,
            groq,
            vader: Arc::new(SentimentIntensityAnalyzer::new()),
            batch_size,
            cycle_timeout,
        }
    }

    /// One analysis cycle: fetch a batch of unprocessed items and analyze
    /// them concurrently. Items still running at the cycle deadline are
    /// cancelled and recorded as timed out; a per-item failure never affects
    /// the other items.
    pub async fn run_cycle(&self) -> Result<AnalyzeStats> {
        let items = self.store.unprocessed_news(self.batch_size as i64).await?;
        if items.is_empty() {
            info!("No unprocessed news tweets found to analyze");
            return Ok(AnalyzeStats::default());
        }
        info!(count = items.len(), "Starting news analysis cycle");

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_ANALYSES));
        let mut tasks = JoinSet::new();
        for item in items {
            let groq = self.groq.clone();
            let vader = Arc::clone(&self.vader);
            let permits = Arc::clone(&semaphore);
            let timeout = self.cycle_timeout;
            let tweet_id = item.external_tweet_id;
            let text = item.text;
            tasks.spawn(async move {
                let work = async {
                    let _permit = permits.acquire_owned().await;
                    analyze_content(groq.as_ref(), &vader, &text).await
                };
                let result = tokio::time::timeout(timeout, work).await;
                (tweet_id, result.ok())
            });
        }

        let mut stats = AnalyzeStats::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((tweet_id, Some(analysis))) => {
                    match self
                        .store
                        .update_news_analysis(&tweet_id, AnalysisStatus::Analyzed, Some(&analysis))
                        .await
                    {
                        Ok(true) => {
                            stats.analyzed += 1;
                            debug!(tweet_id = %tweet_id, "Analysis stored");
                        }
                        Ok(false) => {
                            warn!(tweet_id = %tweet_id, "No news row found to update");
                            stats.failed += 1;
                        }
                        Err(err) => {
                            error!(tweet_id = %tweet_id, "Failed to store analysis: {err}");
                            let _ = self
                                .store
                                .update_news_analysis(&tweet_id, AnalysisStatus::Failed, None)
                                .await;
                            stats.failed += 1;
                        }
                    }
                }
                Ok((tweet_id, None)) => {
                    warn!(tweet_id = %tweet_id, "Analysis timed out, marking item");
                    let _ = self
                        .store
                        .update_news_analysis(&tweet_id, AnalysisStatus::Timeout, None)
                        .await;
                    stats.timed_out += 1;
                }
                Err(join_err) => {
                    error!("Analysis task failed to run: {join_err}");
                    stats.failed += 1;
                }
            }
        }

        info!(
            analyzed = stats.analyzed,
            timed_out = stats.timed_out,
            failed = stats.failed,
            "News analysis cycle finished"
        );
        Ok(stats)
    }
}

/// Analyze one tweet. Never fails: any LLM problem downgrades to the lexicon
/// fallback with a `sentiment_source` recording why.
async fn analyze_content(
    groq: Option<&GroqClient>,
    vader: &SentimentIntensityAnalyzer,
    text: &str,
) -> NewsAnalysis {
    let mut analysis = NewsAnalysis {
        significance: None,
        sentiment: None,
        summary: None,
        sentiment_source: SOURCE_VADER_NO_CLIENT.to_string(),
        raw: None,
    };

    if let Some(client) = groq {
        let prompt = ANALYSIS_PROMPT.replace("{text}", text);
        match client.complete(&prompt).await {
            Ok(response) => {
                let parsed = parse_llm_response(&response);
                analysis.significance = parsed.significance;
                analysis.sentiment = parsed.sentiment;
                analysis.summary = parsed.summary;
                analysis.raw = parsed.raw;
                analysis.sentiment_source = parsed.source.to_string();

                if analysis.sentiment.is_none() && parsed.source == SOURCE_GROQ {
                    debug!("LLM verdict missing sentiment, falling back to lexicon");
                    analysis.sentiment = Some(vader.label(text));
                    analysis.sentiment_source = SOURCE_VADER_NO_SENTIMENT.to_string();
                }
            }
            Err(err) => {
                warn!("LLM analysis call failed: {err}");
                analysis.sentiment_source = SOURCE_VADER_API_ERROR.to_string();
            }
        }
    }

    if analysis.sentiment.is_none() {
        analysis.sentiment = Some(vader.label(text));
    }
    analysis
}

struct ParsedResponse {
    significance: Option<SignificanceLabel>,
    sentiment: Option<SentimentLabel>,
    summary: Option<String>,
    raw: Option<Value>,
    source: &'static str,
}

/// Pull the outermost JSON object out of a free-form LLM response and read
/// the three expected keys. Missing keys become None rather than errors.
fn parse_llm_response(response: &str) -> ParsedResponse {
    let empty = |source| ParsedResponse {
        significance: None,
        sentiment: None,
        summary: None,
        raw: None,
        source,
    };

    let Some(json_str) = extract_json(response) else {
        return empty(SOURCE_VADER_JSON_ERROR);
    };
    let value: Value = match serde_json::from_str(json_str) {
        Ok(value) => value,
        Err(_) => return empty(SOURCE_VADER_JSON_DECODE_ERROR),
    };

    ParsedResponse {
        significance: value
            .get("significance")
            .and_then(Value::as_str)
            .and_then(SignificanceLabel::parse),
        sentiment: value
            .get("sentiment")
            .and_then(Value::as_str)
            .and_then(SentimentLabel::parse),
        summary: value
            .get("summary")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        raw: Some(value),
        source: SOURCE_GROQ,
    }
}

/// Slice between the first `{` and the last `}`, when both exist.
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end > start {
        Some(&response[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_json_response_is_parsed() {
        let response = r#"Here is the analysis:
{"significance": "High", "sentiment": "Positive", "summary": "ETF approval drives adoption."}
"#;
        let parsed = parse_llm_response(response);
        assert_eq!(parsed.significance, Some(SignificanceLabel::High));
        assert_eq!(parsed.sentiment, Some(SentimentLabel::Positive));
        assert_eq!(parsed.summary.as_deref(), Some("ETF approval drives adoption."));
        assert_eq!(parsed.source, SOURCE_GROQ);
    }

    #[test]
    fn missing_keys_become_none() {
        let parsed = parse_llm_response(r#"{"significance": "Medium"}"#);
        assert_eq!(parsed.significance, Some(SignificanceLabel::Medium));
        assert_eq!(parsed.sentiment, None);
        assert_eq!(parsed.summary, None);
        assert_eq!(parsed.source, SOURCE_GROQ);
    }

    #[test]
    fn non_json_response_is_a_json_error() {
        let parsed = parse_llm_response("not json here");
        assert_eq!(parsed.source, SOURCE_VADER_JSON_ERROR);
        assert_eq!(parsed.significance, None);
        assert_eq!(parsed.summary, None);
    }

    #[test]
    fn malformed_object_is_a_decode_error() {
        let parsed = parse_llm_response(r#"{"significance": "High", }"#);
        assert_eq!(parsed.source, SOURCE_VADER_JSON_DECODE_ERROR);
    }

    #[test]
    fn unknown_labels_map_to_none() {
        let parsed =
            parse_llm_response(r#"{"significance": "Massive", "sentiment": "Euphoric"}"#);
        assert_eq!(parsed.significance, None);
        assert_eq!(parsed.sentiment, None);
        assert_eq!(parsed.source, SOURCE_GROQ);
    }

    #[tokio::test]
    async fn no_client_falls_back_to_lexicon() {
        let vader = SentimentIntensityAnalyzer::new();
        let analysis =
            analyze_content(None, &vader, "Terrible news, exchange hacked, panic everywhere").await;
        assert_eq!(analysis.sentiment_source, SOURCE_VADER_NO_CLIENT);
        assert_eq!(analysis.sentiment, Some(SentimentLabel::Negative));
        assert_eq!(analysis.significance, None);
        assert_eq!(analysis.summary, None);
    }

    #[test]
    fn extract_json_finds_outermost_object() {
        assert_eq!(extract_json("abc {\"a\": 1} def"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("} {"), None);
        assert_eq!(extract_json("no braces"), None);
    }
}
