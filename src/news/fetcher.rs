//! News ingestion: poll the recent-search endpoint and persist new tweets.

use crate::adapters::TweetSearch;
use crate::domain::NewsItem;
use crate::error::{BuzzError, Result};
use crate::store::Store;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of one fetch cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchStats {
    pub fetched: usize,
    pub stored: usize,
    pub skipped: usize,
}

/// Maintains the rolling pool of recent Bitcoin-related tweets in the store
pub struct NewsFetcher {
    search: Arc<dyn TweetSearch>,
    store: Arc<dyn Store>,
    query: String,
    max_results: u32,
}

impl NewsFetcher {
    pub fn new(
        search: Arc<dyn TweetSearch>,
        store: Arc<dyn Store>,
        query: String,
        max_results: u32,
    ) -> Self {
        Self {
            search,
            store,
            query,
            max_results,
        }
    }

    /// One fetch cycle: search since the newest stored tweet id and upsert
    /// every result. A rate limit ends the cycle with a warning and no state
    /// change; other errors propagate to the scheduler wrapper.
    pub async fn run_cycle(&self) -> Result<FetchStats> {
        let since_id = self.store.last_fetched_external_id().await?;
        info!(
            query = %self.query,
            since_id = since_id.as_deref().unwrap_or("none"),
            "Starting news fetch cycle"
        );

        let tweets = match self
            .search
            .search_recent(&self.query, since_id.as_deref(), self.max_results)
            .await
        {
            Ok(tweets) => tweets,
            Err(BuzzError::RateLimited(msg)) => {
                warn!("Twitter rate limit hit during fetch: {msg}. Skipping this cycle");
                return Ok(FetchStats::default());
            }
            Err(err) => return Err(err),
        };

        if tweets.is_empty() {
            info!("No new tweets found since the last fetch");
            return Ok(FetchStats::default());
        }

        let mut stats = FetchStats {
            fetched: tweets.len(),
            ..FetchStats::default()
        };
        for tweet in tweets {
            let item = NewsItem::fetched(
                tweet.id,
                tweet.author_id,
                tweet.author_username,
                tweet.text,
                tweet.created_at,
                tweet.metrics,
            );
            match self.store.upsert_news_item(&item).await {
                Ok((_, true)) => stats.stored += 1,
                Ok((_, false)) => stats.skipped += 1,
                Err(err) => {
                    error!(
                        tweet_id = %item.external_tweet_id,
                        "Failed to store news tweet: {err}"
                    );
                }
            }
        }

        info!(
            fetched = stats.fetched,
            stored = stats.stored,
            skipped = stats.skipped,
            "News fetch cycle finished"
        );
        Ok(stats)
    }
}
