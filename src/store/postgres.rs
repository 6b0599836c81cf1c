use crate::domain::{
    AnalysisStatus, BotState, BotStatus, ContentItem, ContentKind, ContentType, NewsAnalysis,
    NewsItem, Post, PriceTick, SentimentLabel, SignificanceLabel,
};
use crate::error::Result;
use crate::store::{derived_scores, Store, DEFAULT_SCHEDULE, SCHEDULE_KEY};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, instrument};

/// PostgreSQL storage backend
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS prices (
        id BIGSERIAL PRIMARY KEY,
        price DOUBLE PRECISION NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        source TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quotes (
        id BIGSERIAL PRIMARY KEY,
        text TEXT NOT NULL,
        category TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        used_count BIGINT NOT NULL DEFAULT 0,
        last_used TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS jokes (
        id BIGSERIAL PRIMARY KEY,
        text TEXT NOT NULL,
        category TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        used_count BIGINT NOT NULL DEFAULT 0,
        last_used TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id BIGSERIAL PRIMARY KEY,
        tweet_id TEXT NOT NULL,
        tweet TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        price DOUBLE PRECISION NOT NULL,
        price_change DOUBLE PRECISION NOT NULL,
        content_type TEXT NOT NULL,
        likes BIGINT NOT NULL DEFAULT 0,
        retweets BIGINT NOT NULL DEFAULT 0,
        engagement_last_checked TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news_tweets (
        id BIGSERIAL PRIMARY KEY,
        original_tweet_id TEXT UNIQUE NOT NULL,
        author_id TEXT,
        author_username TEXT,
        text TEXT NOT NULL,
        published_at TIMESTAMPTZ NOT NULL,
        fetched_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        metrics JSONB,
        source TEXT NOT NULL DEFAULT 'twitter_search',
        processed BOOLEAN DEFAULT FALSE,
        sentiment_score DOUBLE PRECISION,
        sentiment_label TEXT,
        significance_score DOUBLE PRECISION,
        significance_label TEXT,
        summary TEXT,
        sentiment_source TEXT,
        llm_analysis JSONB
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bot_status (
        id BIGSERIAL PRIMARY KEY,
        timestamp TIMESTAMPTZ NOT NULL,
        status TEXT NOT NULL,
        next_scheduled_run TIMESTAMPTZ,
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

impl PostgresStore {
    /// Connect with a bounded pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Reuse an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_post(row: &PgRow) -> Post {
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

    fn row_to_content(row: &PgRow) -> ContentItem {
        ContentItem {
            id: row.get("id"),
            text: row.get("text"),
            category: row.get("category"),
            created_at: row.get("created_at"),
            used_count: row.get("used_count"),
            last_used: row.get("last_used"),
        }
    }

    fn row_to_news(row: &PgRow) -> NewsItem {
        NewsItem {
            id: Some(row.get("id")),
            external_tweet_id: row.get("original_tweet_id"),
            author_id: row.get("author_id"),
            author_username: row.get("author_username"),
            text: row.get("text"),
            published_at: row.get("published_at"),
            fetched_at: row.get("fetched_at"),
            metrics: row.get("metrics"),
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
            llm_analysis: row.get("llm_analysis"),
        }
    }
}

const NEWS_COLUMNS: &str = "id, original_tweet_id, author_id, author_username, text, \
     published_at, fetched_at, metrics, source, processed, sentiment_score, sentiment_label, \
     significance_score, significance_label, summary, sentiment_source, llm_analysis";

#[async_trait]
impl Store for PostgresStore {
    async fn init_schema(&self) -> Result<()> {
        for ddl in CREATE_TABLES {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        sqlx::query(
            "INSERT INTO scheduler_config (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
        )
        .bind(SCHEDULE_KEY)
        .bind(DEFAULT_SCHEDULE)
        .execute(&self.pool)
        .await?;
        debug!("PostgreSQL schema checked");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn store_price(&self, price: f64, source: &str) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO prices (price, timestamp, source) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(price)
        .bind(Utc::now())
        .bind(source)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
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
            "SELECT price FROM prices WHERE timestamp <= $1 ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("price")))
    }

    #[instrument(skip(self, text))]
    async fn log_post(
        &self,
        tweet_id: &str,
        text: &str,
        price: f64,
        change_pct: f64,
        content_type: ContentType,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO posts (tweet_id, tweet, timestamp, price, price_change, content_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(tweet_id)
        .bind(text)
        .bind(Utc::now())
        .bind(price)
        .bind(change_pct)
        .bind(content_type.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn has_posted_within(&self, window: Duration) -> Result<bool> {
        let cutoff = Utc::now() - window;
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM posts WHERE timestamp > $1) AS found")
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("found"))
    }

    async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tweet_id, tweet, timestamp, price, price_change, content_type,
                   likes, retweets, engagement_last_checked
            FROM posts ORDER BY timestamp DESC LIMIT $1
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
            WHERE timestamp > $1
              AND (engagement_last_checked IS NULL OR engagement_last_checked < $2)
            ORDER BY timestamp DESC LIMIT $3
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
            "UPDATE posts SET likes = $1, retweets = $2, engagement_last_checked = $3 WHERE tweet_id = $4",
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
             WHERE last_used IS NULL OR last_used < $1 \
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
            "UPDATE {table} SET used_count = used_count + 1, last_used = $1 WHERE id = $2"
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
            "INSERT INTO {} (text, category, created_at, used_count) VALUES ($1, $2, $3, 0) RETURNING id",
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(text)
            .bind(category)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    async fn delete_content(&self, kind: ContentKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
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
        let row = sqlx::query(
            r#"
            INSERT INTO news_tweets
                (original_tweet_id, author_id, author_username, text, published_at,
                 fetched_at, metrics, source, processed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (original_tweet_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&item.external_tweet_id)
        .bind(&item.author_id)
        .bind(&item.author_username)
        .bind(&item.text)
        .bind(item.published_at)
        .bind(item.fetched_at)
        .bind(&item.metrics)
        .bind(&item.source)
        .bind(item.processed)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok((row.get("id"), true));
        }
        let existing = sqlx::query("SELECT id FROM news_tweets WHERE original_tweet_id = $1")
            .bind(&item.external_tweet_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((existing.get("id"), false))
    }

    async fn last_fetched_external_id(&self) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT original_tweet_id FROM news_tweets \
             ORDER BY CAST(original_tweet_id AS NUMERIC) DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("original_tweet_id")))
    }

    async fn unprocessed_news(&self, limit: i64) -> Result<Vec<NewsItem>> {
        let sql = format!(
            "SELECT {NEWS_COLUMNS} FROM news_tweets \
             WHERE processed = FALSE OR processed IS NULL \
             ORDER BY fetched_at DESC LIMIT $1"
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::row_to_news).collect())
    }

    async fn recent_analyzed_news(&self, hours: i64) -> Result<Vec<NewsItem>> {
        let cutoff = Utc::now() - Duration::hours(hours);
        let sql = format!(
            "SELECT {NEWS_COLUMNS} FROM news_tweets \
             WHERE processed = TRUE AND significance_score IS NOT NULL AND published_at >= $1 \
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
                        processed = TRUE,
                        sentiment_label = $1,
                        significance_label = $2,
                        summary = $3,
                        sentiment_source = $4,
                        sentiment_score = $5,
                        significance_score = $6,
                        llm_analysis = $7
                    WHERE original_tweet_id = $8
                    "#,
                )
                .bind(analysis.sentiment.map(|l| l.as_str()))
                .bind(analysis.significance.map(|l| l.as_str()))
                .bind(&analysis.summary)
                .bind(&analysis.sentiment_source)
                .bind(sentiment_score)
                .bind(significance_score)
                .bind(serde_json::to_value(analysis)?)
                .bind(external_tweet_id)
                .execute(&self.pool)
                .await?
            }
            _ => {
                sqlx::query(
                    "UPDATE news_tweets SET processed = TRUE, sentiment_source = $1 \
                     WHERE original_tweet_id = $2",
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
        let row = sqlx::query("SELECT value FROM scheduler_config WHERE key = $1")
            .bind(SCHEDULE_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn set_schedule_config(&self, schedule: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO scheduler_config (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
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
             VALUES ($1, $2, $3, $4)",
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
