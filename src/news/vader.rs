//! Lexicon-based sentiment fallback.
//!
//! Wraps the `vader_sentiment` analyzer, used when the LLM does not return
//! a sentiment. Only the compound score matters here; it is mapped onto the
//! three-way label with the standard ±0.05 thresholds.

use crate::domain::SentimentLabel;

/// VADER polarity scorer
pub struct SentimentIntensityAnalyzer {
    inner: vader_sentiment::SentimentIntensityAnalyzer<'static>,
}

impl Default for SentimentIntensityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentIntensityAnalyzer {
    pub fn new() -> Self {
        Self {
            inner: vader_sentiment::SentimentIntensityAnalyzer::new(),
        }
    }

    /// Compound polarity score in [-1, 1].
    pub fn compound(&self, text: &str) -> f64 {
        self.inner
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
    }

    /// Classify text with the standard ±0.05 compound thresholds.
    pub fn label(&self, text: &str) -> SentimentLabel {
        label_for(self.compound(text))
    }
}

/// Map a compound score onto the three-way label.
pub fn label_for(compound: f64) -> SentimentLabel {
    if compound >= 0.05 {
        SentimentLabel::Positive
    } else if compound <= -0.05 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_text_scores_positive() {
        let analyzer = SentimentIntensityAnalyzer::new();
        let score = analyzer.compound("Great news, amazing gains, everyone wins");
        assert!(score >= 0.05, "expected positive, got {score}");
        assert_eq!(label_for(score), SentimentLabel::Positive);
    }

    #[test]
    fn negative_text_scores_negative() {
        let analyzer = SentimentIntensityAnalyzer::new();
        let score = analyzer.compound("Terrible crash, panic everywhere, fear and losses");
        assert!(score <= -0.05, "expected negative, got {score}");
        assert_eq!(label_for(score), SentimentLabel::Negative);
    }

    #[test]
    fn neutral_text_scores_neutral() {
        let analyzer = SentimentIntensityAnalyzer::new();
        let score = analyzer.compound("Block 840000 was mined at 14:02 UTC");
        assert_eq!(label_for(score), SentimentLabel::Neutral);
    }

    #[test]
    fn negation_flips_polarity() {
        let analyzer = SentimentIntensityAnalyzer::new();
        let plain = analyzer.compound("this is good");
        let negated = analyzer.compound("this is not good");
        assert!(plain > 0.0);
        assert!(negated < 0.0);
    }

    #[test]
    fn label_thresholds() {
        assert_eq!(label_for(0.05), SentimentLabel::Positive);
        assert_eq!(label_for(0.049), SentimentLabel::Neutral);
        assert_eq!(label_for(0.0), SentimentLabel::Neutral);
        assert_eq!(label_for(-0.049), SentimentLabel::Neutral);
        assert_eq!(label_for(-0.05), SentimentLabel::Negative);
    }
}
