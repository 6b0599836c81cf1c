use serde::Deserialize;
use std::str::FromStr;
use tracing::warn;

/// Main configuration structure, assembled from environment variables
/// (optionally loaded from a `.env` file by the binary).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub twitter: TwitterConfig,
    pub coingecko: CoinGeckoConfig,
    pub llm: LlmConfig,
    pub news: NewsConfig,
    pub posting: PostingConfig,
    pub discord: DiscordConfig,
    pub telegram: TelegramConfig,
    pub engagement: EngagementConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL DSN; when absent the embedded SQLite store is used
    pub url: Option<String>,
    /// Embedded store path
    pub sqlite_path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    /// App-only token, required for search
    pub bearer_token: Option<String>,
    pub search_query: String,
}

impl TwitterConfig {
    /// User-context credentials, required for posting.
    pub fn user_credentials(&self) -> Option<(String, String, String, String)> {
        match (
            &self.api_key,
            &self.api_secret,
            &self.access_token,
            &self.access_token_secret,
        ) {
            (Some(k), Some(s), Some(t), Some(ts)) => {
                Some((k.clone(), s.clone(), t.clone(), ts.clone()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub retry_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    pub fetch_max_results: u32,
    pub analysis_batch_size: u32,
    pub processing_timeout_secs: u64,
    /// Freshness window for publishable news, in hours
    pub hours_limit: i64,
    pub fetch_interval_minutes: u64,
    pub analyze_interval_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostingConfig {
    /// Fallback "HH:MM,HH:MM" schedule when no DB row exists
    pub default_schedule: String,
    pub duplicate_check_minutes: i64,
    pub content_reuse_days: i64,
    /// Display only; all scheduling is UTC
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngagementConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
    pub batch_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Port for the read-only admin API; None disables the server
    pub port: Option<u16>,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env_opt(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: '{}', using default", name, raw);
            default
        }),
        None => default,
    }
}

fn env_bool(name: &str) -> bool {
    env_opt(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

impl AppConfig {
    /// Assemble configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            database: DatabaseConfig {
                url: env_opt("DATABASE_URL"),
                sqlite_path: env_or("SQLITE_DB_PATH", "btcbuzzbot.db"),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5),
            },
            twitter: TwitterConfig {
                api_key: env_opt("TWITTER_API_KEY"),
                api_secret: env_opt("TWITTER_API_SECRET"),
                access_token: env_opt("TWITTER_ACCESS_TOKEN"),
                access_token_secret: env_opt("TWITTER_ACCESS_TOKEN_SECRET"),
                bearer_token: env_opt("TWITTER_BEARER_TOKEN"),
                search_query: env_or("TWITTER_SEARCH_QUERY", "#Bitcoin -is:retweet"),
            },
            coingecko: CoinGeckoConfig {
                base_url: env_or("COINGECKO_API_URL", "https://api.coingecko.com/api/v3"),
                api_key: env_opt("COINGECKO_API_KEY"),
                retry_limit: env_parse("COINGECKO_RETRY_LIMIT", 3),
            },
            llm: LlmConfig {
                api_key: env_opt("GROQ_API_KEY"),
                base_url: env_or("GROQ_API_URL", "https://api.groq.com/openai/v1"),
                model: env_or("GROQ_MODEL", "llama3-8b-8192"),
                temperature: env_parse("LLM_ANALYZE_TEMP", 0.2),
                max_tokens: env_parse("LLM_ANALYZE_MAX_TOKENS", 150),
            },
            news: NewsConfig {
                fetch_max_results: env_parse("NEWS_FETCH_MAX_RESULTS", 10),
                analysis_batch_size: env_parse("NEWS_ANALYSIS_BATCH_SIZE", 30),
                processing_timeout_secs: env_parse("NEWS_PROCESSING_TIMEOUT_SECONDS", 300),
                hours_limit: env_parse("NEWS_HOURS_LIMIT", 12),
                fetch_interval_minutes: env_parse("NEWS_FETCH_INTERVAL_MINUTES", 720),
                analyze_interval_minutes: env_parse("NEWS_ANALYZE_INTERVAL_MINUTES", 30),
            },
            posting: PostingConfig {
                default_schedule: env_or("POST_TIMES", "08:00,12:00,16:00,20:00"),
                duplicate_check_minutes: env_parse("DUPLICATE_POST_CHECK_MINUTES", 5),
                content_reuse_days: env_parse("CONTENT_REUSE_DAYS", 7),
                timezone: env_or("TIMEZONE", "UTC"),
            },
            discord: DiscordConfig {
                enabled: env_bool("ENABLE_DISCORD_POSTING"),
                webhook_url: env_opt("DISCORD_WEBHOOK_URL"),
            },
            telegram: TelegramConfig {
                enabled: env_bool("ENABLE_TELEGRAM_POSTING"),
                bot_token: env_opt("TELEGRAM_BOT_TOKEN"),
                chat_id: env_opt("TELEGRAM_CHAT_ID"),
            },
            engagement: EngagementConfig {
                enabled: env_bool("ENABLE_ENGAGEMENT_UPDATES"),
                interval_minutes: env_parse("ENGAGEMENT_UPDATE_INTERVAL_MINUTES", 360),
                batch_size: env_parse("ENGAGEMENT_UPDATE_BATCH_SIZE", 20),
            },
            admin: AdminConfig {
                port: env_opt("ADMIN_PORT").and_then(|p| p.parse().ok()),
            },
        }
    }

    /// Validate config invariants. Returns list of problems (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.news.fetch_max_results < 5 || self.news.fetch_max_results > 100 {
            errors.push(format!(
                "NEWS_FETCH_MAX_RESULTS must be in [5, 100], got {}",
                self.news.fetch_max_results
            ));
        }
        if self.news.analysis_batch_size == 0 {
            errors.push("NEWS_ANALYSIS_BATCH_SIZE must be > 0".to_string());
        }
        if self.posting.duplicate_check_minutes <= 0 {
            errors.push(format!(
                "DUPLICATE_POST_CHECK_MINUTES must be > 0, got {}",
                self.posting.duplicate_check_minutes
            ));
        }
        if self.llm.temperature < 0.0 || self.llm.temperature > 1.0 {
            errors.push(format!(
                "LLM_ANALYZE_TEMP must be in [0, 1], got {}",
                self.llm.temperature
            ));
        }
        if self.discord.enabled && self.discord.webhook_url.is_none() {
            errors.push("ENABLE_DISCORD_POSTING is set but DISCORD_WEBHOOK_URL is missing".into());
        }
        if self.telegram.enabled
            && (self.telegram.bot_token.is_none() || self.telegram.chat_id.is_none())
        {
            errors.push(
                "ENABLE_TELEGRAM_POSTING is set but TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID is missing"
                    .into(),
            );
        }
        errors
    }
}
