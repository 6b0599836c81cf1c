//! Quote/joke selection for fallback tweets.

use crate::domain::{ContentKind, ContentType, PickedContent};
use crate::error::Result;
use crate::store::Store;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// How many recent posts inform the kind preference
const RECENT_POSTS_WINDOW: i64 = 5;
/// Probability of picking the kind seen less recently
const PREFERENCE_WEIGHT: f64 = 0.7;

const INITIAL_QUOTES: &[&str] = &[
    "HODL to the moon! 🚀",
    "Buy the dip, enjoy the trip. 📈",
    "In crypto we trust. 💎",
    "Not your keys, not your coins. 🔑",
    "Time in the market beats timing the market. ⌛",
];

const INITIAL_JOKES: &[&str] = &[
    "Why's Bitcoin so private? It doesn't share its private keys! 🔐",
    "What do you call a Bitcoin investor? HODLer of last resort! 💼",
    "Why is BTC so volatile? It's got commitment issues! 📊",
    "Why don't Bitcoin and banks get along? They have trust issues! 🏦",
    "What do you call a crypto trader with paper hands? Broke! 📉",
];

/// Chooses between the quote and joke pools, nudging away from the kind
/// that dominated recent posts, and delegates the in-pool selection to the
/// store's least-recently-used policy.
pub struct ContentPicker {
    store: Arc<dyn Store>,
    reuse_window_days: i64,
}

impl ContentPicker {
    pub fn new(store: Arc<dyn Store>, reuse_window_days: i64) -> Self {
        Self {
            store,
            reuse_window_days,
        }
    }

    /// Pick one quote or joke, or None when both pools are empty.
    pub async fn pick(&self) -> Result<Option<PickedContent>> {
        let first = self.preferred_kind().await;
        let second = match first {
            ContentKind::Quote => ContentKind::Joke,
            ContentKind::Joke => ContentKind::Quote,
        };

        for kind in [first, second] {
            if let Some(item) = self.store.random_content(kind, self.reuse_window_days).await? {
                debug!(kind = %kind, id = item.id, "Picked fallback content");
                return Ok(Some(PickedContent {
                    text: item.text,
                    kind,
                }));
            }
        }
        Ok(None)
    }

    /// Prefer the kind that appeared less among the last few posts.
    async fn preferred_kind(&self) -> ContentKind {
        let (quotes_seen, jokes_seen) = match self.store.recent_posts(RECENT_POSTS_WINDOW).await {
            Ok(posts) => posts.iter().fold((0u32, 0u32), |(q, j), post| {
                match post.content_type {
                    ContentType::Quote => (q + 1, j),
                    ContentType::Joke => (q, j + 1),
                    _ => (q, j),
                }
            }),
            Err(_) => (0, 0),
        };

        let mut rng = rand::thread_rng();
        if quotes_seen == jokes_seen {
            if rng.gen_bool(0.5) {
                ContentKind::Quote
            } else {
                ContentKind::Joke
            }
        } else {
            let less_used = if quotes_seen < jokes_seen {
                ContentKind::Quote
            } else {
                ContentKind::Joke
            };
            if rng.gen_bool(PREFERENCE_WEIGHT) {
                less_used
            } else {
                match less_used {
                    ContentKind::Quote => ContentKind::Joke,
                    ContentKind::Joke => ContentKind::Quote,
                }
            }
        }
    }

    /// Seed the starter quotes and jokes into an empty database.
    pub async fn seed_initial_content(&self) -> Result<()> {
        if self.store.count_content(ContentKind::Quote).await? == 0 {
            for quote in INITIAL_QUOTES {
                self.store
                    .add_content(ContentKind::Quote, quote, "motivational")
                    .await?;
            }
            info!("Seeded {} starter quotes", INITIAL_QUOTES.len());
        }
        if self.store.count_content(ContentKind::Joke).await? == 0 {
            for joke in INITIAL_JOKES {
                self.store.add_content(ContentKind::Joke, joke, "humor").await?;
            }
            info!("Seeded {} starter jokes", INITIAL_JOKES.len());
        }
        Ok(())
    }
}
