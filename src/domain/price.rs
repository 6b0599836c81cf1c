use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A live BTC/USD quote from the price provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceQuote {
    pub usd: f64,
    /// 24h change in percent as reported by the provider
    pub change_24h: f64,
}

impl PriceQuote {
    /// Percentage change of this quote against a previous price.
    /// Returns 0.0 when there is no meaningful previous price.
    pub fn change_vs(&self, previous: f64) -> f64 {
        if previous == 0.0 {
            return 0.0;
        }
        (self.usd - previous) / previous * 100.0
    }
}

/// A stored price observation (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTick {
    pub id: Option<i64>,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_vs_previous_price() {
        let quote = PriceQuote {
            usd: 50_000.0,
            change_24h: 1.5,
        };
        let change = quote.change_vs(49_000.0);
        assert!((change - 2.0408163265306123).abs() < 1e-9);
    }

    #[test]
    fn change_vs_zero_previous_is_zero() {
        let quote = PriceQuote {
            usd: 50_000.0,
            change_24h: 0.0,
        };
        assert_eq!(quote.change_vs(0.0), 0.0);
    }
}
