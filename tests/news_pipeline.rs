//! Fetch → analyze pipeline behavior against the embedded store.

use async_trait::async_trait;
use btcbuzzbot::adapters::{FetchedTweet, TweetSearch};
use btcbuzzbot::error::{BuzzError, Result};
use btcbuzzbot::news::{NewsAnalyzer, NewsFetcher};
use btcbuzzbot::store::{SqliteStore, Store};
use chrono::Utc;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

struct StubSearch {
    tweets: Vec<FetchedTweet>,
    rate_limited: bool,
    last_since_id: Mutex<Option<String>>,
}

impl StubSearch {
    fn new(tweets: Vec<FetchedTweet>) -> Self {
        Self {
            tweets,
            rate_limited: false,
            last_since_id: Mutex::new(None),
        }
    }

    fn rate_limited() -> Self {
        Self {
            tweets: Vec::new(),
            rate_limited: true,
            last_since_id: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TweetSearch for StubSearch {
    async fn search_recent(
        &self,
        _query: &str,
        since_id: Option<&str>,
        _max_results: u32,
    ) -> Result<Vec<FetchedTweet>> {
        *self.last_since_id.lock().unwrap() = since_id.map(str::to_string);
        if self.rate_limited {
            return Err(BuzzError::RateLimited("Twitter: HTTP 429".into()));
        }
        Ok(self.tweets.clone())
    }
}

fn tweet(id: &str, text: &str) -> FetchedTweet {
    FetchedTweet {
        id: id.to_string(),
        text: text.to_string(),
        author_id: Some("7".into()),
        author_username: Some("cryptonews".into()),
        created_at: Utc::now(),
        metrics: None,
    }
}

async fn store() -> Arc<dyn Store> {
    let sqlite = SqliteStore::connect_in_memory().await.unwrap();
    sqlite.init_schema().await.unwrap();
    Arc::new(sqlite)
}

#[tokio::test]
async fn fetch_stores_new_tweets_and_skips_duplicates() {
    let store = store().await;
    let search = Arc::new(StubSearch::new(vec![
        tweet("11", "Bitcoin ETF approved"),
        tweet("12", "BTC mining difficulty update"),
        tweet("13", "Exchange hacked overnight"),
    ]));
    let fetcher = NewsFetcher::new(
        Arc::clone(&search) as Arc<dyn TweetSearch>,
        Arc::clone(&store),
        "#Bitcoin -is:retweet".to_string(),
        10,
    );

    let stats = fetcher.run_cycle().await.unwrap();
    assert_eq!(stats.stored, 3);
    assert_eq!(stats.skipped, 0);
    assert!(search.last_since_id.lock().unwrap().is_none());

    // Second cycle sees the same page again: everything is a duplicate and
    // since_id now carries the numeric max of the stored ids.
    let stats = fetcher.run_cycle().await.unwrap();
    assert_eq!(stats.stored, 0);
    assert_eq!(stats.skipped, 3);
    assert_eq!(search.last_since_id.lock().unwrap().as_deref(), Some("13"));

    assert_eq!(store.unprocessed_news(50).await.unwrap().len(), 3);
}

#[tokio::test]
async fn rate_limited_fetch_ends_cycle_without_state_change() {
    let store = store().await;
    let fetcher = NewsFetcher::new(
        Arc::new(StubSearch::rate_limited()),
        Arc::clone(&store),
        "#Bitcoin".to_string(),
        10,
    );

    let stats = fetcher.run_cycle().await.unwrap();
    assert_eq!(stats.fetched, 0);
    assert!(store.unprocessed_news(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn analyzer_without_llm_marks_items_with_lexicon_fallback() {
    let store = store().await;
    let search = Arc::new(StubSearch::new(vec![
        tweet("21", "Massive rally, bullish surge and strong gains for Bitcoin"),
        tweet("22", "Exchange hacked, funds stolen, panic selling"),
    ]));
    NewsFetcher::new(
        Arc::clone(&search) as Arc<dyn TweetSearch>,
        Arc::clone(&store),
        "#Bitcoin".to_string(),
        10,
    )
    .run_cycle()
    .await
    .unwrap();

    let analyzer = NewsAnalyzer::new(Arc::clone(&store), None, 30, Duration::from_secs(300));
    let stats = analyzer.run_cycle().await.unwrap();
    assert_eq!(stats.analyzed, 2);
    assert_eq!(stats.timed_out, 0);

    // Everything is processed exactly once.
    assert!(store.unprocessed_news(50).await.unwrap().is_empty());
    let again = analyzer.run_cycle().await.unwrap();
    assert_eq!(again.analyzed, 0);

    // Without an LLM there is no significance score, so nothing becomes
    // publishable news; the sentiment still carries the fallback source.
    assert!(store.recent_analyzed_news(24).await.unwrap().is_empty());
}
