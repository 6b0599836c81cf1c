//! Tweet composition and truncation.
//!
//! Every template keeps the price line and the trailing hashtags intact;
//! only the variable portion (news summary, quote or joke text) is shortened
//! to fit, with an ellipsis appended when anything was cut.

use crate::domain::{SentimentLabel, SignificanceLabel};

/// Platform ceiling, counted in characters
pub const MAX_TWEET_CHARS: usize = 280;

/// `BTC: $50,000.00 | +2.04%`
pub fn price_line(price: f64, change_pct: f64) -> String {
    format!("BTC: ${} | {:+.2}%", format_usd(price), change_pct)
}

/// Price-line trend emoji: up arrow for non-negative change.
pub fn trend_emoji(change_pct: f64) -> &'static str {
    if change_pct >= 0.0 {
        "📈"
    } else {
        "📉"
    }
}

/// Compose a news tweet from a publishable analysis.
pub fn news_tweet(
    price: f64,
    change_pct: f64,
    significance: Option<SignificanceLabel>,
    sentiment: Option<SentimentLabel>,
    summary: &str,
) -> String {
    let price_str = price_line(price, change_pct);
    let sentiment = sentiment.unwrap_or(SentimentLabel::Neutral);

    let (prefix, suffix) = match (significance, sentiment) {
        (Some(SignificanceLabel::High), SentimentLabel::Positive) => (
            format!("{price_str} 🚀\n🔥 BIG NEWS for #Bitcoin! "),
            " #CryptoNews",
        ),
        (Some(SignificanceLabel::High), SentimentLabel::Negative) => (
            format!("{price_str} ⚠️\n🚨 Critical #Bitcoin Update! "),
            " #CryptoAlert",
        ),
        (Some(SignificanceLabel::High), SentimentLabel::Neutral) => (
            format!("{price_str} 📰\n📢 Key #Bitcoin Development: "),
            " #BTCNews",
        ),
        (Some(SignificanceLabel::Medium), SentimentLabel::Positive) => (
            format!("{price_str} 📈\n👍 Positive #Bitcoin Signal: "),
            " #Crypto",
        ),
        (Some(SignificanceLabel::Medium), SentimentLabel::Negative) => (
            format!("{price_str} 📉\n❗ Notable #Bitcoin Update (Caution): "),
            " #BTC",
        ),
        (Some(SignificanceLabel::Medium), SentimentLabel::Neutral) => (
            format!("{price_str} 📊\n🔍 #Bitcoin Update: "),
            " #CryptoReport",
        ),
        (_, sentiment) => {
            let emoji = match sentiment {
                SentimentLabel::Positive => "💡",
                SentimentLabel::Negative => "🧐",
                SentimentLabel::Neutral => "➡️",
            };
            (format!("{price_str} {emoji}\n"), " #Bitcoin")
        }
    };

    fit(&prefix, summary, suffix)
}

/// Compose a price + quote/joke tweet.
pub fn fallback_tweet(price: f64, change_pct: f64, text: &str) -> String {
    let prefix = format!(
        "{} {}\n",
        price_line(price, change_pct),
        trend_emoji(change_pct)
    );
    fit(&prefix, text, "\n#Bitcoin #Crypto")
}

/// Compose a bare price tweet.
pub fn price_tweet(price: f64, change_pct: f64) -> String {
    format!(
        "{} {}\n#Bitcoin #Price",
        price_line(price, change_pct),
        trend_emoji(change_pct)
    )
}

/// Assemble `prefix + variable + suffix`, shrinking only the variable part.
fn fit(prefix: &str, variable: &str, suffix: &str) -> String {
    let fixed = prefix.chars().count() + suffix.chars().count();
    let budget = MAX_TWEET_CHARS.saturating_sub(fixed);
    let variable_len = variable.chars().count();

    if variable_len <= budget {
        return format!("{prefix}{variable}{suffix}");
    }
    let shortened: String = variable.chars().take(budget.saturating_sub(1)).collect();
    format!("{prefix}{}…{suffix}", shortened.trim_end())
}

/// Thousands-separated USD amount with two decimals.
fn format_usd(price: f64) -> String {
    let formatted = format!("{:.2}", price.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    let digits = int_part.len();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usd_formatting_groups_thousands() {
        assert_eq!(format_usd(50_000.0), "50,000.00");
        assert_eq!(format_usd(1_234_567.891), "1,234,567.89");
        assert_eq!(format_usd(999.5), "999.50");
        assert_eq!(format_usd(0.0), "0.00");
    }

    #[test]
    fn price_line_has_sign_and_emoji_rule() {
        assert_eq!(price_line(50_000.0, 2.04), "BTC: $50,000.00 | +2.04%");
        assert_eq!(price_line(48_000.0, -2.04), "BTC: $48,000.00 | -2.04%");
        assert_eq!(trend_emoji(0.0), "📈");
        assert_eq!(trend_emoji(1.5), "📈");
        assert_eq!(trend_emoji(-0.01), "📉");
    }

    #[test]
    fn high_positive_news_template() {
        let tweet = news_tweet(
            50_000.0,
            2.04,
            Some(SignificanceLabel::High),
            Some(SentimentLabel::Positive),
            "Major retailer integrates Bitcoin.",
        );
        assert!(tweet.starts_with("BTC: $50,000.00 | +2.04% 🚀"));
        assert!(tweet.contains("🔥 BIG NEWS for #Bitcoin! Major retailer integrates Bitcoin."));
        assert!(tweet.ends_with("#CryptoNews"));
    }

    #[test]
    fn medium_negative_news_template() {
        let tweet = news_tweet(
            48_000.0,
            -1.0,
            Some(SignificanceLabel::Medium),
            Some(SentimentLabel::Negative),
            "Regulator opens inquiry.",
        );
        assert!(tweet.contains("❗ Notable #Bitcoin Update (Caution): Regulator opens inquiry."));
        assert!(tweet.ends_with("#BTC"));
    }

    #[test]
    fn low_significance_uses_simple_template() {
        let tweet = news_tweet(
            48_000.0,
            -1.0,
            Some(SignificanceLabel::Low),
            Some(SentimentLabel::Neutral),
            "Another day on-chain.",
        );
        assert!(tweet.contains("➡️\nAnother day on-chain."));
        assert!(tweet.ends_with("#Bitcoin"));
    }

    #[test]
    fn quote_tweet_matches_expected_layout() {
        let tweet = fallback_tweet(48_000.0, -2.04, "HODL to the moon!");
        assert_eq!(
            tweet,
            "BTC: $48,000.00 | -2.04% 📉\nHODL to the moon!\n#Bitcoin #Crypto"
        );
    }

    #[test]
    fn price_only_tweet() {
        let tweet = price_tweet(60_000.0, 0.5);
        assert_eq!(tweet, "BTC: $60,000.00 | +0.50% 📈\n#Bitcoin #Price");
    }

    #[test]
    fn long_summary_is_truncated_preserving_frame() {
        let summary = "x".repeat(400);
        let tweet = news_tweet(
            50_000.0,
            2.0,
            Some(SignificanceLabel::High),
            Some(SentimentLabel::Positive),
            &summary,
        );
        assert!(tweet.chars().count() <= MAX_TWEET_CHARS);
        assert!(tweet.starts_with("BTC: $50,000.00 | +2.00% 🚀"));
        assert!(tweet.contains('…'));
        assert!(tweet.ends_with("#CryptoNews"));
    }

    #[test]
    fn long_quote_is_truncated_preserving_hashtags() {
        let quote = "y".repeat(400);
        let tweet = fallback_tweet(50_000.0, 2.0, &quote);
        assert!(tweet.chars().count() <= MAX_TWEET_CHARS);
        assert!(tweet.ends_with("\n#Bitcoin #Crypto"));
        assert!(tweet.contains('…'));
    }

    #[test]
    fn every_composition_fits_the_ceiling() {
        for change in [-12.5, 0.0, 7.77] {
            for summary_len in [0, 50, 200, 500] {
                let summary = "a".repeat(summary_len);
                let tweet = news_tweet(
                    123_456.78,
                    change,
                    Some(SignificanceLabel::High),
                    Some(SentimentLabel::Negative),
                    &summary,
                );
                assert!(tweet.chars().count() <= MAX_TWEET_CHARS);
            }
        }
    }
}
