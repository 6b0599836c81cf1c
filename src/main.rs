use btcbuzzbot::adapters::{
    CoinGeckoClient, DiscordNotifier, GroqClient, GroqConfig, SocialClient, TelegramNotifier,
    TweetSearch, TwitterClient,
};
use btcbuzzbot::cli::{Cli, Commands, ContentCommands, ScheduleCommands};
use btcbuzzbot::domain::ContentKind;
use btcbuzzbot::error::{BuzzError, Result};
use btcbuzzbot::news::{NewsAnalyzer, NewsFetcher};
use btcbuzzbot::publisher::{ContentPicker, Publisher};
use btcbuzzbot::scheduler::{normalize_schedule, JobContext, SchedulerEngine};
use btcbuzzbot::services::{AdminServer, EngagementUpdater};
use btcbuzzbot::status::StatusLogger;
use btcbuzzbot::store::Store;
use btcbuzzbot::{store, AppConfig};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    for problem in config.validate() {
        warn!("Config: {problem}");
    }

    let store = store::connect(&config.database).await?;

    match cli.command {
        None | Some(Commands::Run) => run_bot(config, store).await,
        Some(Commands::PostNow { label }) => {
            let components = Components::build(&config, &store)?;
            let outcome = components.publisher.run_cycle(&label).await?;
            println!("Publish cycle finished: {outcome:?}");
            Ok(())
        }
        Some(Commands::FetchNews) => {
            let components = Components::build(&config, &store)?;
            let fetcher = components
                .fetcher
                .ok_or_else(|| BuzzError::Auth("TWITTER_BEARER_TOKEN not configured".into()))?;
            let stats = fetcher.run_cycle().await?;
            println!(
                "Fetched {} tweets: {} stored, {} duplicates skipped",
                stats.fetched, stats.stored, stats.skipped
            );
            Ok(())
        }
        Some(Commands::AnalyzeNews) => {
            let components = Components::build(&config, &store)?;
            let stats = components.analyzer.run_cycle().await?;
            println!(
                "Analyzed {} items ({} timed out, {} failed)",
                stats.analyzed, stats.timed_out, stats.failed
            );
            Ok(())
        }
        Some(Commands::Schedule { command }) => run_schedule_command(command, &store).await,
        Some(Commands::Quote { command }) => {
            run_content_command(command, ContentKind::Quote, &store).await
        }
        Some(Commands::Joke { command }) => {
            run_content_command(command, ContentKind::Joke, &store).await
        }
        Some(Commands::Status) => {
            match store.latest_bot_status().await? {
                Some(status) => {
                    println!("[{}] {}: {}", status.timestamp, status.status, status.message);
                    if let Some(next) = status.next_scheduled_run {
                        println!("Next scheduled run: {next}");
                    }
                }
                None => println!("No status recorded yet"),
            }
            Ok(())
        }
    }
}

/// All long-lived components, constructed once and passed around by handle.
struct Components {
    publisher: Arc<Publisher>,
    fetcher: Option<Arc<NewsFetcher>>,
    analyzer: Arc<NewsAnalyzer>,
    engagement: Option<Arc<EngagementUpdater>>,
    status: StatusLogger,
}

impl Components {
    fn build(config: &AppConfig, store: &Arc<dyn Store>) -> Result<Self> {
        let twitter = Arc::new(TwitterClient::from_config(&config.twitter)?);
        let price = Arc::new(CoinGeckoClient::new(&config.coingecko)?);
        let status = StatusLogger::new(Arc::clone(store));
        let picker = ContentPicker::new(Arc::clone(store), config.posting.content_reuse_days);

        let discord = if config.discord.enabled {
            config
                .discord
                .webhook_url
                .clone()
                .map(DiscordNotifier::new)
        } else {
            None
        };
        let telegram = if config.telegram.enabled {
            match (
                config.telegram.bot_token.clone(),
                config.telegram.chat_id.clone(),
            ) {
                (Some(token), Some(chat_id)) => Some(TelegramNotifier::new(token, chat_id)),
                _ => None,
            }
        } else {
            None
        };

        if !twitter.can_post() {
            warn!("Twitter user-context credentials missing; publishing will fail");
        }

        let publisher = Arc::new(Publisher::new(
            Arc::clone(store),
            price,
            Arc::clone(&twitter) as Arc<dyn SocialClient>,
            picker,
            status.clone(),
            discord,
            telegram,
            config.news.hours_limit,
            config.posting.duplicate_check_minutes,
        ));

        let fetcher = twitter.can_search().then(|| {
            Arc::new(NewsFetcher::new(
                Arc::clone(&twitter) as Arc<dyn TweetSearch>,
                Arc::clone(store),
                config.twitter.search_query.clone(),
                config.news.fetch_max_results,
            ))
        });

        let groq = match GroqConfig::from_llm_config(&config.llm) {
            Some(groq_config) => Some(GroqClient::new(groq_config)?),
            None => None,
        };
        let analyzer = Arc::new(NewsAnalyzer::new(
            Arc::clone(store),
            groq,
            config.news.analysis_batch_size,
            Duration::from_secs(config.news.processing_timeout_secs),
        ));

        let engagement = config.engagement.enabled.then(|| {
            Arc::new(EngagementUpdater::new(
                Arc::clone(store),
                Arc::clone(&twitter) as Arc<dyn SocialClient>,
                config.engagement.batch_size,
            ))
        });

        Ok(Self {
            publisher,
            fetcher,
            analyzer,
            engagement,
            status,
        })
    }
}

async fn run_bot(config: AppConfig, store: Arc<dyn Store>) -> Result<()> {
    info!("Starting btcbuzzbot");
    let components = Components::build(&config, &store)?;

    // Seed the content pools on a fresh database.
    ContentPicker::new(Arc::clone(&store), config.posting.content_reuse_days)
        .seed_initial_content()
        .await?;

    let ctx = JobContext {
        store: Arc::clone(&store),
        publisher: Arc::clone(&components.publisher),
        fetcher: components.fetcher.clone(),
        analyzer: Arc::clone(&components.analyzer),
        engagement: components.engagement.clone(),
        status: components.status.clone(),
    };

    let engine = Arc::new(SchedulerEngine::new(ctx, config.clone()).await?);
    engine.start().await?;

    if let Some(port) = config.admin.port {
        let admin = AdminServer::new(Arc::clone(&store), engine.reschedule_handle(), port);
        tokio::spawn(async move {
            if let Err(err) = admin.serve().await {
                error!("Admin server failed: {err}");
            }
        });
    }

    engine.run_until(shutdown_signal()).await?;
    info!("Shutdown complete");
    Ok(())
}

async fn run_schedule_command(command: ScheduleCommands, store: &Arc<dyn Store>) -> Result<()> {
    match command {
        ScheduleCommands::Show => {
            match store.schedule_config().await? {
                Some(schedule) => println!("Schedule (UTC): {schedule}"),
                None => println!("No schedule configured"),
            }
            Ok(())
        }
        ScheduleCommands::Set { times } => {
            let normalized = normalize_schedule(&times);
            if normalized.is_empty() {
                return Err(BuzzError::Parse(format!(
                    "no valid HH:MM times in '{times}'"
                )));
            }
            store.set_schedule_config(&normalized).await?;
            println!("Schedule updated to: {normalized}");
            println!("A running bot picks this up on its next reschedule signal or restart.");
            Ok(())
        }
    }
}

async fn run_content_command(
    command: ContentCommands,
    kind: ContentKind,
    store: &Arc<dyn Store>,
) -> Result<()> {
    match command {
        ContentCommands::Add { text, category } => {
            let default_category = match kind {
                ContentKind::Quote => "motivational",
                ContentKind::Joke => "humor",
            };
            let id = store
                .add_content(kind, &text, category.as_deref().unwrap_or(default_category))
                .await?;
            println!("Added {kind} #{id}");
            Ok(())
        }
        ContentCommands::List => {
            let items = store.list_content(kind).await?;
            if items.is_empty() {
                println!("No {kind}s stored");
            }
            for item in items {
                let last_used = item
                    .last_used
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "#{} [{}] used {} times, last {}: {}",
                    item.id, item.category, item.used_count, last_used, item.text
                );
            }
            Ok(())
        }
        ContentCommands::Delete { id } => {
            if store.delete_content(kind, id).await? {
                println!("Deleted {kind} #{id}");
            } else {
                println!("No {kind} with id {id}");
            }
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => error!("Failed to install SIGTERM handler: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
