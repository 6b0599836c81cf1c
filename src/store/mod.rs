//! Typed persistence over a relational backend.
//!
//! Two interchangeable implementations: [`PostgresStore`] for production
//! (`DATABASE_URL`) and [`SqliteStore`] for the embedded fallback. Both own
//! schema creation and expose the same typed API; callers never see SQL.

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::config::DatabaseConfig;
use crate::domain::{
    AnalysisStatus, BotState, BotStatus, ContentItem, ContentKind, ContentType, NewsAnalysis,
    NewsItem, Post, PriceTick,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;

/// Key under which the posting schedule lives in `scheduler_config`
pub const SCHEDULE_KEY: &str = "schedule";

/// Default "HH:MM" schedule seeded into an empty database
pub const DEFAULT_SCHEDULE: &str = "08:00,12:00,16:00,20:00";

/// Typed persistence API shared by every component.
///
/// Operations return typed errors and never retry internally; transient
/// failures are the caller's concern. Mutating operations that pair a read
/// with a write (content selection, news analysis updates) run inside a
/// transaction on the backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create all tables when missing and seed the default schedule row.
    /// Never destructive against an existing database.
    async fn init_schema(&self) -> Result<()>;

    // ==================== Prices ====================

    /// Append a price observation stamped now. Returns the new row id.
    async fn store_price(&self, price: f64, source: &str) -> Result<i64>;

    /// Newest stored price by timestamp.
    async fn latest_price(&self) -> Result<Option<PriceTick>>;

    /// Newest price at least 24 hours old; analytics only.
    async fn price_at_24h_ago(&self) -> Result<Option<f64>>;

    // ==================== Posts ====================

    async fn log_post(
        &self,
        tweet_id: &str,
        text: &str,
        price: f64,
        change_pct: f64,
        content_type: ContentType,
    ) -> Result<i64>;

    /// True iff any post exists newer than `now - window`.
    async fn has_posted_within(&self, window: Duration) -> Result<bool>;

    /// Newest posts first.
    async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>>;

    async fn posts_needing_engagement_update(&self, limit: i64) -> Result<Vec<Post>>;

    async fn update_post_engagement(
        &self,
        tweet_id: &str,
        likes: i64,
        retweets: i64,
    ) -> Result<bool>;

    // ==================== Quotes & jokes ====================

    /// Pick a random item, preferring the least-used items whose `last_used`
    /// is null or older than the reuse window. Falls back to any random item
    /// when every row is inside the window. Atomically increments
    /// `used_count` and stamps `last_used`. Returns None only for an empty
    /// table.
    async fn random_content(
        &self,
        kind: ContentKind,
        reuse_window_days: i64,
    ) -> Result<Option<ContentItem>>;

    async fn add_content(&self, kind: ContentKind, text: &str, category: &str) -> Result<i64>;

    async fn delete_content(&self, kind: ContentKind, id: i64) -> Result<bool>;

    async fn list_content(&self, kind: ContentKind) -> Result<Vec<ContentItem>>;

    async fn count_content(&self, kind: ContentKind) -> Result<i64>;

    // ==================== News ====================

    /// Insert a fetched news item. A conflict on `external_tweet_id` is
    /// silently skipped; returns `(row_id, inserted)`.
    async fn upsert_news_item(&self, item: &NewsItem) -> Result<(i64, bool)>;

    /// Highest stored tweet id by numeric value, for `since_id` paging.
    async fn last_fetched_external_id(&self) -> Result<Option<String>>;

    /// Unanalyzed items, newest fetched first.
    async fn unprocessed_news(&self, limit: i64) -> Result<Vec<NewsItem>>;

    /// Analyzed items published within the window, ordered by significance
    /// score then recency.
    async fn recent_analyzed_news(&self, hours: i64) -> Result<Vec<NewsItem>>;

    /// Mark one item processed. On [`AnalysisStatus::Analyzed`] the label,
    /// score, summary and raw-analysis columns are written; on failure or
    /// timeout only `sentiment_source` records the reason. Returns false
    /// when no row matches.
    async fn update_news_analysis(
        &self,
        external_tweet_id: &str,
        status: AnalysisStatus,
        analysis: Option<&NewsAnalysis>,
    ) -> Result<bool>;

    // ==================== Scheduler config ====================

    async fn schedule_config(&self) -> Result<Option<String>>;

    async fn set_schedule_config(&self, schedule: &str) -> Result<()>;

    // ==================== Bot status ====================

    async fn log_bot_status(
        &self,
        status: BotState,
        message: &str,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<()>;

    async fn latest_bot_status(&self) -> Result<Option<BotStatus>>;
}

/// Connect to the configured backend and bring the schema up.
pub async fn connect(cfg: &DatabaseConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match &cfg.url {
        Some(url) => {
            let store = PostgresStore::connect(url, cfg.max_connections).await?;
            info!("Connected to PostgreSQL store");
            Arc::new(store)
        }
        None => {
            let store = SqliteStore::connect(&cfg.sqlite_path).await?;
            info!(path = %cfg.sqlite_path, "Using embedded SQLite store");
            Arc::new(store)
        }
    };
    store.init_schema().await?;
    Ok(store)
}

/// Scores written alongside an `analyzed` row, derived from the labels.
/// Unknown labels map to no score.
pub(crate) fn derived_scores(analysis: &NewsAnalysis) -> (Option<f64>, Option<f64>) {
    let sentiment = analysis.sentiment.map(|l| l.score());
    let significance = analysis.significance.map(|l| l.score());
    (sentiment, significance)
}
