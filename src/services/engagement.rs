//! Engagement refresh: periodically re-read public metrics for recent posts.

use crate::adapters::SocialClient;
use crate::error::Result;
use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pacing delay between per-post metric lookups
const LOOKUP_DELAY: Duration = Duration::from_secs(1);

/// Refreshes like/retweet counters on recently published posts
pub struct EngagementUpdater {
    store: Arc<dyn Store>,
    social: Arc<dyn SocialClient>,
    batch_size: u32,
}

impl EngagementUpdater {
    pub fn new(store: Arc<dyn Store>, social: Arc<dyn SocialClient>, batch_size: u32) -> Self {
        Self {
            store,
            social,
            batch_size,
        }
    }

    /// One refresh cycle over up to `batch_size` stale posts. Lookup
    /// failures skip the post; it stays eligible for the next cycle.
    pub async fn run_cycle(&self) -> Result<(usize, usize)> {
        let posts = self
            .store
            .posts_needing_engagement_update(self.batch_size as i64)
            .await?;
        if posts.is_empty() {
            info!("No posts need an engagement update");
            return Ok((0, 0));
        }
        info!(count = posts.len(), "Refreshing post engagement");

        let mut updated = 0;
        let mut failed = 0;
        for post in posts {
            match self.social.get_engagement(&post.tweet_id).await {
                Ok(engagement) => {
                    debug!(
                        tweet_id = %post.tweet_id,
                        likes = engagement.likes,
                        retweets = engagement.retweets,
                        "Fetched engagement"
                    );
                    match self
                        .store
                        .update_post_engagement(&post.tweet_id, engagement.likes, engagement.retweets)
                        .await
                    {
                        Ok(true) => updated += 1,
                        Ok(false) | Err(_) => failed += 1,
                    }
                }
                Err(err) => {
                    warn!(tweet_id = %post.tweet_id, "Engagement lookup failed: {err}");
                    failed += 1;
                }
            }
            tokio::time::sleep(LOOKUP_DELAY).await;
        }

        info!(updated, failed, "Engagement refresh cycle finished");
        Ok((updated, failed))
    }
}
