use crate::domain::{
    AnalysisStatus, BotState, BotStatus, ContentItem, ContentKind, ContentType, NewsAnalysis,
    NewsItem, Post, PriceTick, SentimentLabel, SignificanceLabel,
};
use crate::error::Result;
use crate::store::{derived_scores, Store, DEFAULT_SCHEDULE, SCHEDULE_KEY};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;

/// Embedded SQLite storage backend, used when no `DATABASE_URL` is set.
/// Mirrors [`super::PostgresStore`] operation for operation; all timestamps
/// are bound as UTC instants so comparisons behave identically.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS prices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        price REAL NOT NULL,
        timestamp TEXT NOT NULL,
        source TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quotes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        category TEXT NOT NULL,
        created_at TEXT NOT NULL,
        used_count INTEGER NOT NULL DEFAULT 0,
        last_used TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS jokes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        category TEXT NOT NULL,
        created_at TEXT NOT NULL,
        used_count INTEGER NOT NULL DEFAULT 0,
        last_used TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tweet_id TEXT NOT NULL,
        tweet TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        price REAL NOT NULL,
        price_change REAL NOT NULL,
        content_type TEXT NOT NULL,
        likes INTEGER NOT NULL DEFAULT 0,
        retweets INTEGER NOT NULL DEFAULT 0,
        engagement_last_checked TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news_tweets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        original_tweet_id TEXT UNIQUE NOT NULL,
        author_id TEXT,
        author_username TEXT,
        text TEXT NOT NULL,
        published_at TEXT NOT NULL,
        fetched_at TEXT NOT NULL,
        metrics TEXT,
        source TEXT NOT NULL DEFAULT 'twitter_search',
        processed INTEGER DEFAULT 0,
        sentiment_score REAL,
        sentiment_label TEXT,
        significance_score REAL,
        significance_label TEXT,
        summary TEXT,
        sentiment_source TEXT,
        llm_analysis TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bot_status (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        status TEXT NOT NULL,
        next_scheduled_run TEXT,
        message TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scheduler_config (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// In-memory database on a single connection; used by tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(sqlx::Error::from)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_post(row: &SqliteRow) -> Post {
        Post {
            id: Some(row.get("id")),
            tweet_id: row.get("tweet_id"),
            text: row.get("tweet"),
            timestamp: row.get("timestamp"),
            price: row.get("price"),
            price_change_pct: row.get("price_change"),
            content_type: ContentType::parse(row.get::<String, _>("content_type").as_str())
                .unwrap_or(ContentType::Manual),
            likes: row.get("likes"),
            retweets: row.get("retweets"),
            engagement_last_checked: row.get("engagement_last_checked"),
        }
    }

    fn row_to_content(row: &SqliteRow) -> ContentItem {
        ContentItem {
            id: row.get("id"),
            text: row.get("text"),
            category: row.get("category"),
            created_at: row.get("created_at"),
            used_count: row.get("used_count"),
            last_used: row.get("last_used"),
        }
    }

    fn row_to_news(row: &SqliteRow) -> NewsItem {
        NewsItem {
            id: Some(row.get("id")),
            external_tweet_id: row.get("original_tweet_id"),
            author_id: row.get("author_id"),
            author_username: row.get("author_username"),
            text: row.get("text"),
            published_at: row.get("published_at"),
            fetched_at: row.get("fetched_at"),
            metrics: row
                .get::<Option<String>, _>("metrics")
                .and_then(|s| serde_json::from_str(&s).ok()),
            source: row.get("source"),
            processed: row.get::<Option<bool>, _>("processed").unwrap_or(false),
            sentiment_score: row.get("sentiment_score"),
            sentiment_label: row
                .get::<Option<String>, _>("sentiment_label")
                .and_then(|s| SentimentLabel::parse(&s)),
            significance_score: row.get("significance_score"),
            significance_label: row
                .get::<Option<String>, _>("significance_label")
                .and_then(|s| SignificanceLabel::parse(&s)),
            summary: row.get("summary"),
            sentiment_source: row.get("sentiment_source"),
            llm_analysis: row
                .get::<Option<String>, _>("llm_analysis")
                .and_then(|s| serde_json::from_str(&s).ok()),
        }
    }
}

const NEWS_COLUMNS: &str = "id, original_tweet_id, author_id, author_username, text, \
     published_at, fetched_at, metrics, source, processed, sentiment_score, sentiment_label, \
     significance_score, significance_label, summary, sentiment_source, llm_analysis";

#[async_trait]
impl Store for SqliteStore {
    async fn init_schema(&self) -> Result<()> {
        for ddl in CREATE_TABLES {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        sqlx::query(
            "INSERT INTO scheduler_config (key, value) VALUES (?, ?) ON CONFLICT (key) DO NOTHING",
        )
        .bind(SCHEDULE_KEY)
        .bind(DEFAULT_SCHEDULE)
        .execute(&self.pool)
        .await?;
        debug!("SQLite schema checked");
        Ok(())
    }

    async fn store_price(&self, price: f64, source: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO prices (price, timestamp, source) VALUES (?, ?, ?)")
            .bind(price)
            .bind(Utc::now())
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn latest_price(&self) -> Result<Option<PriceTick>> {
        let row = sqlx::query(
            "SELECT id, price, timestamp, source FROM prices ORDER BY timestamp DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| PriceTick {
            id: Some(r.get("id")),
            price: r.get("price"),
            timestamp: r.get("timestamp"),
            source: r.get("source"),
        }))
    }

    async fn price_at_24h_ago(&self) -> Result<Option<f64>> {
        let cutoff = Utc::now() - Duration::hours(24);
        let row = sqlx::query(
            "SELECT price FROM prices WHERE timestamp <= ? ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("price")))
    }

    async fn log_post(
        &self,
        tweet_id: &str,
        text: &str,
        price: f64,
        change_pct: f64,
        content_type: ContentType,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (tweet_id, tweet, timestamp, price, price_change, content_type)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tweet_id)
        .bind(text)
        .bind(Utc::now())
        .bind(price)
        .bind(change_pct)
        .bind(content_type.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn has_posted_within(&self, window: Duration) -> Result<bool> {
        let cutoff = Utc::now() - window;
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM posts WHERE timestamp > ?) AS found")
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("found") != 0)
    }

    async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tweet_id, tweet, timestamp, price, price_change, content_type,
                   likes, retweets, engagement_last_checked
            FROM posts ORDER BY timestamp DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::row_to_post).collect())
    }

    async fn posts_needing_engagement_update(&self, limit: i64) -> Result<Vec<Post>> {
        let newer_than = Utc::now() - Duration::days(7);
        let stale_before = Utc::now() - Duration::hours(6);
        let rows = sqlx::query(
            r#"
            SELECT id, tweet_id, tweet, timestamp, price, price_change, content_type,
                   likes, retweets, engagement_last_checked
            FROM posts
            WHERE timestamp > ?
              AND (engagement_last_checked IS NULL OR engagement_last_checked < ?)
            ORDER BY timestamp DESC LIMIT ?
            "#,
        )
        .bind(newer_than)
        .bind(stale_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::row_to_post).collect())
    }

    async fn update_post_engagement(
        &self,
        tweet_id: &str,
        likes: i64,
        retweets: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET likes = ?, retweets = ?, engagement_last_checked = ? WHERE tweet_id = ?",
        )
        .bind(likes)
        .bind(retweets)
        .bind(Utc::now())
        .bind(tweet_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn random_content(
        &self,
        kind: ContentKind,
        reuse_window_days: i64,
    ) -> Result<Option<ContentItem>> {
        let table = kind.table();
        let cutoff = Utc::now() - Duration::days(reuse_window_days);
        let mut tx = self.pool.begin().await?;

        let select_fresh = format!(
            "SELECT id, text, category, created_at, used_count, last_used FROM {table} \
             WHERE last_used IS NULL OR last_used < ? \
             ORDER BY used_count ASC, RANDOM() LIMIT 1"
        );
        let mut row = sqlx::query(&select_fresh)
            .bind(cutoff)
            .fetch_optional(&mut *tx)
            .await?;

        if row.is_none() {
            let select_any = format!(
                "SELECT id, text, category, created_at, used_count, last_used FROM {table} \
                 ORDER BY RANDOM() LIMIT 1"
            );
            row = sqlx::query(&select_any).fetch_optional(&mut *tx).await?;
        }

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let mut item = Self::row_to_content(&row);

        let now = Utc::now();
        let update = format!(
            "UPDATE {table} SET used_count = used_count + 1, last_used = ? WHERE id = ?"
        );
        sqlx::query(&update)
            .bind(now)
            .bind(item.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        item.used_count += 1;
        item.last_used = Some(now);
        Ok(Some(item))
    }

    async fn add_content(&self, kind: ContentKind, text: &str, category: &str) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {} (text, category, created_at, used_count) VALUES (?, ?, ?, 0)",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(text)
            .bind(category)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn delete_content(&self, kind: ContentKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_content(&self, kind: ContentKind) -> Result<Vec<ContentItem>> {
        let sql = format!(
            "SELECT id, text, category, created_at, used_count, last_used FROM {} ORDER BY id",
            kind.table()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::row_to_content).collect())
    }

    async fn count_content(&self, kind: ContentKind) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", kind.table());
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        Ok(row.get("n"))
    }

    async fn upsert_news_item(&self, item: &NewsItem) -> Result<(i64, bool)> {
        let result = sqlx::query(
            r#"
            INSERT INTO news_tweets
                (original_tweet_id, author_id, author_username, text, published_at,
                 fetched_at, metrics, source, processed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (original_tweet_id) DO NOTHING
            "#,
        )
        .bind(&item.external_tweet_id)
        .bind(&item.author_id)
        .bind(&item.author_username)
        .bind(&item.text)
        .bind(item.published_at)
        .bind(item.fetched_at)
        .bind(item.metrics.as_ref().map(|m| m.to_string()))
        .bind(&item.source)
        .bind(item.processed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok((result.last_insert_rowid(), true));
        }
        let existing = sqlx::query("SELECT id FROM news_tweets WHERE original_tweet_id = ?")
            .bind(&item.external_tweet_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((existing.get("id"), false))
    }

    async fn last_fetched_external_id(&self) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT original_tweet_id FROM news_tweets \
             ORDER BY CAST(original_tweet_id AS INTEGER) DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("original_tweet_id")))
    }

    async fn unprocessed_news(&self, limit: i64) -> Result<Vec<NewsItem>> {
        let sql = format!(
            "SELECT {NEWS_COLUMNS} FROM news_tweets \
             WHERE processed = 0 OR processed IS NULL \
             ORDER BY fetched_at DESC LIMIT ?"
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::row_to_news).collect())
    }

    async fn recent_analyzed_news(&self, hours: i64) -> Result<Vec<NewsItem>> {
        let cutoff = Utc::now() - Duration::hours(hours);
        let sql = format!(
            "SELECT {NEWS_COLUMNS} FROM news_tweets \
             WHERE processed = 1 AND significance_score IS NOT NULL AND published_at >= ? \
             ORDER BY significance_score DESC, published_at DESC"
        );
        let rows = sqlx::query(&sql).bind(cutoff).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::row_to_news).collect())
    }

    async fn update_news_analysis(
        &self,
        external_tweet_id: &str,
        status: AnalysisStatus,
        analysis: Option<&NewsAnalysis>,
    ) -> Result<bool> {
        let result = match (status, analysis) {
            (AnalysisStatus::Analyzed, Some(analysis)) => {
                let (sentiment_score, significance_score) = derived_scores(analysis);
                sqlx::query(
                    r#"
                    UPDATE news_tweets SET
                        processed = 1,
                        sentiment_label = ?,
                        significance_label = ?,
                        summary = ?,
                        sentiment_source = ?,
                        sentiment_score = ?,
                        significance_score = ?,
                        llm_analysis = ?
                    WHERE original_tweet_id = ?
                    "#,
                )
                .bind(analysis.sentiment.map(|l| l.as_str()))
                .bind(analysis.significance.map(|l| l.as_str()))
                .bind(&analysis.summary)
                .bind(&analysis.sentiment_source)
                .bind(sentiment_score)
                .bind(significance_score)
                .bind(serde_json::to_string(analysis)?)
                .bind(external_tweet_id)
                .execute(&self.pool)
                .await?
            }
            _ => {
                sqlx::query(
                    "UPDATE news_tweets SET processed = 1, sentiment_source = ? \
                     WHERE original_tweet_id = ?",
                )
                .bind(status.as_str())
                .bind(external_tweet_id)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    async fn schedule_config(&self) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM scheduler_config WHERE key = ?")
            .bind(SCHEDULE_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn set_schedule_config(&self, schedule: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO scheduler_config (key, value) VALUES (?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(SCHEDULE_KEY)
        .bind(schedule)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn log_bot_status(
        &self,
        status: BotState,
        message: &str,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO bot_status (timestamp, status, next_scheduled_run, message) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(Utc::now())
        .bind(status.as_str())
        .bind(next_run)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_bot_status(&self) -> Result<Option<BotStatus>> {
        let row = sqlx::query(
            "SELECT id, timestamp, status, next_scheduled_run, message FROM bot_status \
             ORDER BY timestamp DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| BotStatus {
            id: Some(r.get("id")),
            timestamp: r.get("timestamp"),
            status: r.get("status"),
            next_scheduled_run: r.get("next_scheduled_run"),
            message: r.get("message"),
        }))
    }
}
