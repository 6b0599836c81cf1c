pub mod coingecko;
pub mod discord;
pub mod groq;
pub mod telegram;
pub mod twitter;

pub use coingecko::{CoinGeckoClient, PriceSource};
pub use discord::DiscordNotifier;
pub use groq::{GroqClient, GroqConfig};
pub use telegram::TelegramNotifier;
pub use twitter::{Engagement, FetchedTweet, SocialClient, TweetSearch, TwitterClient};
