//! Scheduler reconfiguration behavior: stable tweet-job ids derived from the
//! stored schedule, remove-then-add rescheduling, and shutdown status.

use async_trait::async_trait;
use btcbuzzbot::adapters::{Engagement, PriceSource, SocialClient};
use btcbuzzbot::domain::PriceQuote;
use btcbuzzbot::error::Result;
use btcbuzzbot::news::NewsAnalyzer;
use btcbuzzbot::publisher::{ContentPicker, Publisher};
use btcbuzzbot::scheduler::{JobContext, SchedulerEngine};
use btcbuzzbot::status::StatusLogger;
use btcbuzzbot::store::{SqliteStore, Store};
use btcbuzzbot::AppConfig;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;

struct StubPrice;

#[async_trait]
impl PriceSource for StubPrice {
    async fn btc_price(&self) -> Result<PriceQuote> {
        Ok(PriceQuote {
            usd: 50_000.0,
            change_24h: 0.0,
        })
    }
}

struct StubSocial;

#[async_trait]
impl SocialClient for StubSocial {
    async fn post_message(&self, _text: &str) -> Result<String> {
        Ok("1".to_string())
    }

    async fn get_engagement(&self, _tweet_id: &str) -> Result<Engagement> {
        Ok(Engagement::default())
    }
}

async fn engine_with_store() -> (Arc<SchedulerEngine>, Arc<dyn Store>) {
    let sqlite = SqliteStore::connect_in_memory().await.unwrap();
    sqlite.init_schema().await.unwrap();
    let store: Arc<dyn Store> = Arc::new(sqlite);

    let status = StatusLogger::new(Arc::clone(&store));
    let publisher = Arc::new(Publisher::new(
        Arc::clone(&store),
        Arc::new(StubPrice),
        Arc::new(StubSocial),
        ContentPicker::new(Arc::clone(&store), 7),
        status.clone(),
        None,
        None,
        12,
        5,
    ));
    let analyzer = Arc::new(NewsAnalyzer::new(
        Arc::clone(&store),
        None,
        30,
        Duration::from_secs(300),
    ));

    let ctx = JobContext {
        store: Arc::clone(&store),
        publisher,
        fetcher: None,
        analyzer,
        engagement: None,
        status,
    };
    let config = AppConfig::from_env();
    let engine = Arc::new(SchedulerEngine::new(ctx, config).await.unwrap());
    (engine, store)
}

/// Next UTC instant at which the given wall-clock time occurs.
fn next_occurrence(hour: u32, minute: u32) -> DateTime<Utc> {
    let now = Utc::now();
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
    let today = now.date_naive().and_time(time).and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

#[tokio::test]
async fn startup_builds_jobs_from_default_schedule() {
    let (engine, _store) = engine_with_store().await;
    engine.start().await.unwrap();

    assert_eq!(
        engine.tweet_job_ids().await,
        vec![
            "scheduled_tweet_0800",
            "scheduled_tweet_1200",
            "scheduled_tweet_1600",
            "scheduled_tweet_2000",
        ]
    );
    assert!(engine.next_scheduled_run().await.is_some());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn reschedule_replaces_all_tweet_jobs() {
    let (engine, store) = engine_with_store().await;
    engine.start().await.unwrap();

    store.set_schedule_config("09:30,21:00").await.unwrap();
    engine.reschedule_tweet_jobs().await.unwrap();

    assert_eq!(
        engine.tweet_job_ids().await,
        vec!["scheduled_tweet_0930", "scheduled_tweet_2100"]
    );

    // The reported next run is the nearer of the two configured instants.
    let next = engine.next_scheduled_run().await.unwrap();
    let expected = next_occurrence(9, 30).min(next_occurrence(21, 0));
    assert!((next - expected).num_seconds().abs() <= 60);

    // The newest status row reflects the reconfiguration.
    let status = store.latest_bot_status().await.unwrap().unwrap();
    assert_eq!(status.status, "Scheduled");
    assert!(status.message.contains("09:30,21:00"));
    assert!(status.next_scheduled_run.is_some());

    engine.shutdown().await.unwrap();
    let stopped = store.latest_bot_status().await.unwrap().unwrap();
    assert_eq!(stopped.status, "Stopped");
}

#[tokio::test]
async fn empty_schedule_row_falls_back_to_default() {
    let (engine, store) = engine_with_store().await;
    store.set_schedule_config("").await.unwrap();
    engine.start().await.unwrap();

    // Blank row falls back to the POST_TIMES default.
    assert_eq!(engine.tweet_job_ids().await.len(), 4);
    engine.shutdown().await.unwrap();
}
