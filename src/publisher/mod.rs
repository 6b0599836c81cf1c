//! Publish cycle orchestration: price, content selection, duplicate guard,
//! posting, and best-effort side-channel fan-out.

pub mod compose;
pub mod picker;

pub use picker::ContentPicker;

use crate::adapters::{DiscordNotifier, PriceSource, SocialClient, TelegramNotifier};
use crate::domain::{BotState, ContentType, SentimentLabel};
use crate::error::{BuzzError, Result};
use crate::status::StatusLogger;
use crate::store::Store;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

/// Significance score at which news is always publishable
const HIGH_SIGNIFICANCE: f64 = 0.8;
/// Significance score at which news is publishable with benign sentiment
const MEDIUM_SIGNIFICANCE: f64 = 0.4;

/// Result of one publish cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Posted {
        tweet_id: String,
        content_type: ContentType,
    },
    /// Duplicate guard tripped; nothing was posted
    SkippedRecentPost,
    /// The platform rejected the post as duplicate content; treated as a
    /// soft success
    SkippedPlatformDuplicate,
}

/// Orchestrates one publish cycle end to end
pub struct Publisher {
    store: Arc<dyn Store>,
    price: Arc<dyn PriceSource>,
    social: Arc<dyn SocialClient>,
    picker: ContentPicker,
    status: StatusLogger,
    discord: Option<DiscordNotifier>,
    telegram: Option<TelegramNotifier>,
    news_hours_limit: i64,
    duplicate_window: Duration,
}

impl Publisher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        price: Arc<dyn PriceSource>,
        social: Arc<dyn SocialClient>,
        picker: ContentPicker,
        status: StatusLogger,
        discord: Option<DiscordNotifier>,
        telegram: Option<TelegramNotifier>,
        news_hours_limit: i64,
        duplicate_window_minutes: i64,
    ) -> Self {
        Self {
            store,
            price,
            social,
            picker,
            status,
            discord,
            telegram,
            news_hours_limit,
            duplicate_window: Duration::minutes(duplicate_window_minutes),
        }
    }

    /// Run one publish cycle for the given scheduled time label. Every
    /// failure is converted into an Error status row before propagating;
    /// a failed cycle never produces a post row.
    pub async fn run_cycle(&self, scheduled_label: &str) -> Result<CycleOutcome> {
        match self.run_cycle_inner(scheduled_label).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.status
                    .log(
                        BotState::Error,
                        &format!("Publish cycle for {scheduled_label} failed: {err}"),
                    )
                    .await;
                Err(err)
            }
        }
    }

    async fn run_cycle_inner(&self, label: &str) -> Result<CycleOutcome> {
        info!(label, "Starting publish cycle");

        let quote = self.price.btc_price().await?;
        let previous = self.store.latest_price().await?;
        let change_pct = match &previous {
            Some(tick) => quote.change_vs(tick.price),
            None => 0.0,
        };
        info!(
            usd = quote.usd,
            change_pct,
            "Fetched BTC price (previous: {:?})",
            previous.as_ref().map(|t| t.price)
        );
        self.store.store_price(quote.usd, "coingecko").await?;

        let (text, content_type) = self.select_content(quote.usd, change_pct).await;

        if self.store.has_posted_within(self.duplicate_window).await? {
            let message = format!(
                "Skipped publish for {label}: recent post within the last {} minutes",
                self.duplicate_window.num_minutes()
            );
            warn!("{message}");
            self.status.log(BotState::Running, &message).await;
            return Ok(CycleOutcome::SkippedRecentPost);
        }

        let tweet_id = match self.social.post_message(&text).await {
            Ok(id) => id,
            Err(BuzzError::DuplicatePost(detail)) => {
                let message =
                    format!("Skipped publish for {label}: platform reported duplicate content");
                warn!("{message} ({detail})");
                self.status.log(BotState::Running, &message).await;
                return Ok(CycleOutcome::SkippedPlatformDuplicate);
            }
            Err(err) => return Err(err),
        };

        self.store
            .log_post(&tweet_id, &text, quote.usd, change_pct, content_type)
            .await?;

        self.fan_out(&text).await;

        self.status
            .log(
                BotState::Running,
                &format!("Posted {content_type} tweet {tweet_id} for {label}"),
            )
            .await;
        info!(tweet_id = %tweet_id, content_type = %content_type, "Publish cycle finished");
        Ok(CycleOutcome::Posted {
            tweet_id,
            content_type,
        })
    }

    /// Select what to say: a publishable news summary first, then a quote or
    /// joke, then the bare price line.
    async fn select_content(&self, price: f64, change_pct: f64) -> (String, ContentType) {
        match self.store.recent_analyzed_news(self.news_hours_limit).await {
            Ok(items) => {
                for item in items {
                    let Some(summary) = item.summary.as_deref().filter(|s| !s.is_empty()) else {
                        continue;
                    };
                    let Some(significance) = item.significance_score else {
                        continue;
                    };
                    if !news_is_usable(
                        significance,
                        item.sentiment_label,
                        item.sentiment_source.as_deref(),
                    ) {
                        continue;
                    }
                    info!(
                        tweet_id = %item.external_tweet_id,
                        significance,
                        "Selected news item for publishing"
                    );
                    return (
                        compose::news_tweet(
                            price,
                            change_pct,
                            item.significance_label,
                            item.sentiment_label,
                            summary,
                        ),
                        ContentType::News,
                    );
                }
                info!("No suitable news item found, falling back to curated content");
            }
            Err(err) => warn!("News selection failed, falling back: {err}"),
        }

        match self.picker.pick().await {
            Ok(Some(picked)) => {
                let content_type = ContentType::from(picked.kind);
                return (
                    compose::fallback_tweet(price, change_pct, &picked.text),
                    content_type,
                );
            }
            Ok(None) => warn!("No curated content available, falling back to price-only tweet"),
            Err(err) => warn!("Content picker failed, falling back to price-only tweet: {err}"),
        }

        (
            compose::price_tweet(price, change_pct),
            ContentType::PriceFallback,
        )
    }

    /// Best-effort fan-out to the enabled side channels. Failures are
    /// logged and never propagate.
    async fn fan_out(&self, text: &str) {
        if let Some(discord) = &self.discord {
            if !discord.send(text).await {
                warn!("Discord side-channel delivery failed");
            }
        }
        if let Some(telegram) = &self.telegram {
            if !telegram.send(text).await {
                warn!("Telegram side-channel delivery failed");
            }
        }
    }
}

/// Usability rule for an analyzed news item.
///
/// High significance always publishes; medium significance publishes only
/// with positive or neutral sentiment. Items whose sentiment came from the
/// lexicon fallback must clear the high-significance bar.
fn news_is_usable(
    significance_score: f64,
    sentiment: Option<SentimentLabel>,
    sentiment_source: Option<&str>,
) -> bool {
    let usable = if significance_score >= HIGH_SIGNIFICANCE {
        true
    } else if significance_score >= MEDIUM_SIGNIFICANCE {
        matches!(
            sentiment,
            Some(SentimentLabel::Positive) | Some(SentimentLabel::Neutral)
        )
    } else {
        false
    };

    if usable
        && sentiment_source
            .map(|s| s.contains("vader_fallback"))
            .unwrap_or(false)
    {
        return significance_score >= HIGH_SIGNIFICANCE;
    }
    usable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisStatus, ContentKind, NewsAnalysis, NewsItem, PriceQuote, SignificanceLabel};
    use crate::news::analyzer::{SOURCE_GROQ, SOURCE_VADER_JSON_ERROR};
    use crate::store::SqliteStore;
    use crate::adapters::Engagement;
    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::mock;
    use mockall::predicate::always;

    mock! {
        Price {}

        #[async_trait]
        impl PriceSource for Price {
            async fn btc_price(&self) -> Result<PriceQuote>;
        }
    }

    mock! {
        Social {}

        #[async_trait]
        impl SocialClient for Social {
            async fn post_message(&self, text: &str) -> Result<String>;
            async fn get_engagement(&self, tweet_id: &str) -> Result<Engagement>;
        }
    }

    async fn test_store() -> Arc<dyn Store> {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store.init_schema().await.unwrap();
        Arc::new(store)
    }

    fn publisher(
        store: Arc<dyn Store>,
        price: MockPrice,
        social: MockSocial,
    ) -> Publisher {
        Publisher::new(
            Arc::clone(&store),
            Arc::new(price),
            Arc::new(social),
            ContentPicker::new(Arc::clone(&store), 7),
            StatusLogger::new(Arc::clone(&store)),
            None,
            None,
            12,
            5,
        )
    }

    async fn insert_analyzed_news(
        store: &Arc<dyn Store>,
        tweet_id: &str,
        significance: SignificanceLabel,
        sentiment: SentimentLabel,
        summary: &str,
        sentiment_source: &str,
    ) {
        let item = NewsItem::fetched(
            tweet_id.to_string(),
            Some("42".into()),
            Some("newsbot".into()),
            format!("tweet text for {tweet_id}"),
            Utc::now(),
            None,
        );
        store.upsert_news_item(&item).await.unwrap();
        let analysis = NewsAnalysis {
            significance: Some(significance),
            sentiment: Some(sentiment),
            summary: Some(summary.to_string()),
            sentiment_source: sentiment_source.to_string(),
            raw: None,
        };
        store
            .update_news_analysis(tweet_id, AnalysisStatus::Analyzed, Some(&analysis))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn happy_path_selects_high_significance_news() {
        let store = test_store().await;
        store.store_price(49_000.0, "coingecko").await.unwrap();
        insert_analyzed_news(
            &store,
            "900001",
            SignificanceLabel::High,
            SentimentLabel::Positive,
            "Major retailer integrates Bitcoin.",
            SOURCE_GROQ,
        )
        .await;
        // A quote exists, but news must win regardless.
        store
            .add_content(ContentKind::Quote, "HODL!", "motivational")
            .await
            .unwrap();

        let mut price = MockPrice::new();
        price.expect_btc_price().times(1).returning(|| {
            Ok(PriceQuote {
                usd: 50_000.0,
                change_24h: 1.5,
            })
        });
        let mut social = MockSocial::new();
        social
            .expect_post_message()
            .with(always())
            .times(1)
            .returning(|_| Ok("111".to_string()));

        let outcome = publisher(Arc::clone(&store), price, social)
            .run_cycle("12:00")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Posted {
                tweet_id: "111".to_string(),
                content_type: ContentType::News,
            }
        );

        let posts = store.recent_posts(10).await.unwrap();
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert!(post.text.starts_with("BTC: $50,000.00 | +2.04% 🚀"));
        assert!(post.text.contains("Major retailer integrates Bitcoin."));
        assert!(post.text.contains("#CryptoNews"));
        assert_eq!(post.content_type, ContentType::News);
        assert_eq!(post.price, 50_000.0);

        let latest = store.latest_price().await.unwrap().unwrap();
        assert_eq!(latest.price, 50_000.0);
    }

    #[tokio::test]
    async fn falls_back_to_quote_when_no_news() {
        let store = test_store().await;
        store.store_price(49_000.0, "coingecko").await.unwrap();
        store
            .add_content(ContentKind::Quote, "HODL to the moon!", "motivational")
            .await
            .unwrap();

        let mut price = MockPrice::new();
        price.expect_btc_price().times(1).returning(|| {
            Ok(PriceQuote {
                usd: 48_000.0,
                change_24h: -2.0,
            })
        });
        let mut social = MockSocial::new();
        social
            .expect_post_message()
            .times(1)
            .returning(|_| Ok("222".to_string()));

        let outcome = publisher(Arc::clone(&store), price, social)
            .run_cycle("16:00")
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Posted {
                content_type: ContentType::Quote,
                ..
            }
        ));

        let post = &store.recent_posts(1).await.unwrap()[0];
        assert_eq!(
            post.text,
            "BTC: $48,000.00 | -2.04% 📉\nHODL to the moon!\n#Bitcoin #Crypto"
        );
    }

    #[tokio::test]
    async fn duplicate_guard_skips_without_posting() {
        let store = test_store().await;
        store
            .log_post("555", "earlier tweet", 47_000.0, 0.1, ContentType::Quote)
            .await
            .unwrap();

        let mut price = MockPrice::new();
        price.expect_btc_price().times(1).returning(|| {
            Ok(PriceQuote {
                usd: 48_000.0,
                change_24h: 0.0,
            })
        });
        let mut social = MockSocial::new();
        social.expect_post_message().times(0);

        let outcome = publisher(Arc::clone(&store), price, social)
            .run_cycle("20:00")
            .await
            .unwrap();
        assert_eq!(outcome, CycleOutcome::SkippedRecentPost);

        // Only the pre-existing post remains.
        assert_eq!(store.recent_posts(10).await.unwrap().len(), 1);
        let status = store.latest_bot_status().await.unwrap().unwrap();
        assert!(status.message.contains("Skipped"));
        assert!(status.message.contains("recent post"));
    }

    #[tokio::test]
    async fn platform_duplicate_is_soft_success() {
        let store = test_store().await;

        let mut price = MockPrice::new();
        price.expect_btc_price().times(1).returning(|| {
            Ok(PriceQuote {
                usd: 48_000.0,
                change_24h: 0.0,
            })
        });
        let mut social = MockSocial::new();
        social
            .expect_post_message()
            .times(1)
            .returning(|_| Err(BuzzError::DuplicatePost("duplicate content".into())));

        let outcome = publisher(Arc::clone(&store), price, social)
            .run_cycle("08:00")
            .await
            .unwrap();
        assert_eq!(outcome, CycleOutcome::SkippedPlatformDuplicate);
        assert!(store.recent_posts(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn price_failure_writes_error_status_and_no_post() {
        let store = test_store().await;

        let mut price = MockPrice::new();
        price
            .expect_btc_price()
            .times(1)
            .returning(|| Err(BuzzError::RateLimited("CoinGecko: HTTP 429".into())));
        let mut social = MockSocial::new();
        social.expect_post_message().times(0);

        let result = publisher(Arc::clone(&store), price, social)
            .run_cycle("08:00")
            .await;
        assert!(result.is_err());
        assert!(store.recent_posts(10).await.unwrap().is_empty());

        let status = store.latest_bot_status().await.unwrap().unwrap();
        assert_eq!(status.status, "Error");
    }

    #[tokio::test]
    async fn medium_negative_news_is_skipped_for_fallback() {
        let store = test_store().await;
        insert_analyzed_news(
            &store,
            "900002",
            SignificanceLabel::Medium,
            SentimentLabel::Negative,
            "Exchange under investigation.",
            SOURCE_GROQ,
        )
        .await;
        store
            .add_content(ContentKind::Joke, "Why is BTC volatile?", "humor")
            .await
            .unwrap();

        let mut price = MockPrice::new();
        price.expect_btc_price().times(1).returning(|| {
            Ok(PriceQuote {
                usd: 48_000.0,
                change_24h: 0.0,
            })
        });
        let mut social = MockSocial::new();
        social
            .expect_post_message()
            .times(1)
            .returning(|_| Ok("333".to_string()));

        let outcome = publisher(Arc::clone(&store), price, social)
            .run_cycle("12:00")
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Posted {
                content_type: ContentType::Joke,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn bare_price_tweet_when_nothing_else_available() {
        let store = test_store().await;

        let mut price = MockPrice::new();
        price.expect_btc_price().times(1).returning(|| {
            Ok(PriceQuote {
                usd: 60_000.0,
                change_24h: 0.0,
            })
        });
        let mut social = MockSocial::new();
        social
            .expect_post_message()
            .times(1)
            .returning(|_| Ok("444".to_string()));

        let outcome = publisher(Arc::clone(&store), price, social)
            .run_cycle("12:00")
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Posted {
                content_type: ContentType::PriceFallback,
                ..
            }
        ));
        let post = &store.recent_posts(1).await.unwrap()[0];
        assert!(post.text.ends_with("#Bitcoin #Price"));
    }

    #[test]
    fn usability_rules() {
        // High significance publishes regardless of sentiment.
        assert!(news_is_usable(0.9, Some(SentimentLabel::Negative), Some(SOURCE_GROQ)));
        assert!(news_is_usable(1.0, None, Some(SOURCE_GROQ)));
        // Medium needs benign sentiment.
        assert!(news_is_usable(0.5, Some(SentimentLabel::Positive), Some(SOURCE_GROQ)));
        assert!(news_is_usable(0.5, Some(SentimentLabel::Neutral), Some(SOURCE_GROQ)));
        assert!(!news_is_usable(0.5, Some(SentimentLabel::Negative), Some(SOURCE_GROQ)));
        assert!(!news_is_usable(0.5, None, Some(SOURCE_GROQ)));
        // Low never publishes.
        assert!(!news_is_usable(0.1, Some(SentimentLabel::Positive), Some(SOURCE_GROQ)));
        // Lexicon-fallback sentiment needs the high bar.
        assert!(!news_is_usable(0.5, Some(SentimentLabel::Positive), Some(SOURCE_VADER_JSON_ERROR)));
        assert!(news_is_usable(0.9, Some(SentimentLabel::Positive), Some(SOURCE_VADER_JSON_ERROR)));
    }
}
