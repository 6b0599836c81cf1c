//! Scheduler engine wrapping `tokio-cron-scheduler`.
//!
//! Owns the job table: one daily cron job per configured "HH:MM" UTC time
//! (ids `scheduled_tweet_HHMM`), interval jobs for news fetch/analysis and
//! the optional engagement refresh. External components only request add or
//! remove through a reschedule signal; the engine re-reads the schedule row
//! and swaps the tweet jobs.

use crate::config::AppConfig;
use crate::domain::BotState;
use crate::error::Result;
use crate::news::{NewsAnalyzer, NewsFetcher};
use crate::publisher::Publisher;
use crate::scheduler::{parse_schedule, ScheduleTime};
use crate::services::EngagementUpdater;
use crate::status::StatusLogger;
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Everything the scheduled jobs need, constructed once at startup
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn Store>,
    pub publisher: Arc<Publisher>,
    pub fetcher: Option<Arc<NewsFetcher>>,
    pub analyzer: Arc<NewsAnalyzer>,
    pub engagement: Option<Arc<EngagementUpdater>>,
    pub status: StatusLogger,
}

/// The in-process scheduler engine
pub struct SchedulerEngine {
    scheduler: JobScheduler,
    ctx: JobContext,
    config: AppConfig,
    /// job id ("scheduled_tweet_HHMM") -> scheduler uuid
    tweet_jobs: Mutex<HashMap<String, Uuid>>,
    /// Signal asking the engine to re-read the schedule row
    reschedule: Arc<Notify>,
}

impl SchedulerEngine {
    pub async fn new(ctx: JobContext, config: AppConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            ctx,
            config,
            tweet_jobs: Mutex::new(HashMap::new()),
            reschedule: Arc::new(Notify::new()),
        })
    }

    /// Handle used by the admin surface and CLI to request a reschedule.
    pub fn reschedule_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.reschedule)
    }

    /// Add interval jobs, build the tweet jobs from the stored schedule and
    /// start ticking.
    pub async fn start(&self) -> Result<()> {
        self.add_interval_jobs().await?;
        self.reschedule_tweet_jobs().await?;

        let mut scheduler = self.scheduler.clone();
        scheduler.start().await?;

        let next = self.next_scheduled_run().await;
        self.ctx
            .status
            .log_with_next_run(BotState::Running, "Scheduler started successfully", next)
            .await;
        info!(next_run = ?next, "Scheduler started");
        Ok(())
    }

    /// Block until shutdown is requested, re-reading the schedule whenever
    /// the reschedule signal fires.
    pub async fn run_until(&self, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.reschedule.notified() => {
                    info!("Reschedule signal received");
                    if let Err(err) = self.reschedule_tweet_jobs().await {
                        error!("Reschedule failed: {err}");
                        self.ctx
                            .status
                            .log(BotState::Warning, &format!("Reschedule failed: {err}"))
                            .await;
                    }
                }
            }
        }
        self.shutdown().await
    }

    /// Stop accepting triggers and write the final status row.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down scheduler engine");
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        self.ctx
            .status
            .log(BotState::Stopped, "Scheduler engine shut down")
            .await;
        Ok(())
    }

    /// Earliest upcoming tweet-job fire time.
    pub async fn next_scheduled_run(&self) -> Option<DateTime<Utc>> {
        let ids: Vec<Uuid> = self.tweet_jobs.lock().await.values().copied().collect();
        let mut scheduler = self.scheduler.clone();
        let mut next: Option<DateTime<Utc>> = None;
        for id in ids {
            if let Ok(Some(tick)) = scheduler.next_tick_for_job(id).await {
                next = Some(match next {
                    Some(current) if current <= tick => current,
                    _ => tick,
                });
            }
        }
        next
    }

    /// Ids of the currently installed tweet jobs, for the admin surface.
    pub async fn tweet_job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tweet_jobs.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove-then-add swap of the daily tweet jobs from the stored
    /// schedule, falling back to the configured default when the row is
    /// missing or empty.
    pub async fn reschedule_tweet_jobs(&self) -> Result<()> {
        let stored = self.ctx.store.schedule_config().await.unwrap_or_else(|err| {
            error!("Failed to read schedule from store: {err}");
            None
        });
        let schedule_str = match stored.filter(|s| !s.trim().is_empty()) {
            Some(s) => s,
            None => {
                warn!(
                    "No schedule row found, using default '{}'",
                    self.config.posting.default_schedule
                );
                self.config.posting.default_schedule.clone()
            }
        };
        let times = parse_schedule(&schedule_str);

        let mut scheduler = self.scheduler.clone();
        let mut jobs = self.tweet_jobs.lock().await;

        let removed = jobs.len();
        for (job_id, uuid) in jobs.drain() {
            if let Err(err) = scheduler.remove(&uuid).await {
                warn!("Could not remove job {job_id}: {err}");
            } else {
                info!("Removed tweet job {job_id}");
            }
        }

        for time in &times {
            match self.make_tweet_job(*time) {
                Ok(job) => {
                    let uuid = scheduler.add(job).await?;
                    info!("Added tweet job {} for {} UTC", time.job_id(), time.label());
                    jobs.insert(time.job_id(), uuid);
                }
                Err(err) => error!("Could not create tweet job for {}: {err}", time.label()),
            }
        }
        let added = jobs.len();
        drop(jobs);

        info!(removed, added, "Tweet jobs rescheduled");
        let next = self.next_scheduled_run().await;
        self.ctx
            .status
            .log_with_next_run(
                BotState::Scheduled,
                &format!("Scheduler reconfigured. Next tweets at: {schedule_str}"),
                next,
            )
            .await;
        Ok(())
    }

    /// Build the daily cron job for one posting time. Overlapping runs of
    /// the same job are skipped with a warning.
    fn make_tweet_job(&self, time: ScheduleTime) -> Result<Job> {
        let publisher = Arc::clone(&self.ctx.publisher);
        let running = Arc::new(Mutex::new(()));
        let label = time.label();

        let job = Job::new_async(time.cron_expr().as_str(), move |_uuid, _scheduler| {
            let publisher = Arc::clone(&publisher);
            let running = Arc::clone(&running);
            let label = label.clone();
            Box::pin(async move {
                let Ok(_guard) = running.try_lock() else {
                    warn!("Tweet job for {label} still running, skipping this trigger");
                    return;
                };
                if let Err(err) = publisher.run_cycle(&label).await {
                    error!("Scheduled publish for {label} failed: {err}");
                }
            })
        })?;
        Ok(job)
    }

    async fn add_interval_jobs(&self) -> Result<()> {
        let mut scheduler = self.scheduler.clone();

        if let Some(fetcher) = &self.ctx.fetcher {
            let fetcher = Arc::clone(fetcher);
            let status = self.ctx.status.clone();
            let running = Arc::new(Mutex::new(()));
            let interval = Duration::from_secs(self.config.news.fetch_interval_minutes * 60);
            let job = Job::new_repeated_async(interval, move |_uuid, _scheduler| {
                let fetcher = Arc::clone(&fetcher);
                let status = status.clone();
                let running = Arc::clone(&running);
                Box::pin(async move {
                    let Ok(_guard) = running.try_lock() else {
                        warn!("News fetch cycle still running, skipping this trigger");
                        return;
                    };
                    if let Err(err) = fetcher.run_cycle().await {
                        error!("News fetch cycle failed: {err}");
                        status
                            .log(BotState::Error, &format!("News fetch cycle failed: {err}"))
                            .await;
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!(
                minutes = self.config.news.fetch_interval_minutes,
                "News fetch job added"
            );
        } else {
            warn!("News fetch job NOT added: no search credentials configured");
        }

        {
            let analyzer = Arc::clone(&self.ctx.analyzer);
            let status = self.ctx.status.clone();
            let running = Arc::new(Mutex::new(()));
            let interval = Duration::from_secs(self.config.news.analyze_interval_minutes * 60);
            let job = Job::new_repeated_async(interval, move |_uuid, _scheduler| {
                let analyzer = Arc::clone(&analyzer);
                let status = status.clone();
                let running = Arc::clone(&running);
                Box::pin(async move {
                    let Ok(_guard) = running.try_lock() else {
                        warn!("News analysis cycle still running, skipping this trigger");
                        return;
                    };
                    if let Err(err) = analyzer.run_cycle().await {
                        error!("News analysis cycle failed: {err}");
                        status
                            .log(
                                BotState::Error,
                                &format!("News analysis cycle failed: {err}"),
                            )
                            .await;
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!(
                minutes = self.config.news.analyze_interval_minutes,
                "News analysis job added"
            );
        }

        if let Some(engagement) = &self.ctx.engagement {
            let engagement = Arc::clone(engagement);
            let running = Arc::new(Mutex::new(()));
            let interval = Duration::from_secs(self.config.engagement.interval_minutes * 60);
            let job = Job::new_repeated_async(interval, move |_uuid, _scheduler| {
                let engagement = Arc::clone(&engagement);
                let running = Arc::clone(&running);
                Box::pin(async move {
                    let Ok(_guard) = running.try_lock() else {
                        warn!("Engagement refresh still running, skipping this trigger");
                        return;
                    };
                    if let Err(err) = engagement.run_cycle().await {
                        error!("Engagement refresh failed: {err}");
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!(
                minutes = self.config.engagement.interval_minutes,
                "Engagement refresh job added"
            );
        }

        Ok(())
    }
}
