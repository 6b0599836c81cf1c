pub mod analyzer;
pub mod fetcher;
pub mod vader;

pub use analyzer::{AnalyzeStats, NewsAnalyzer};
pub use fetcher::{FetchStats, NewsFetcher};
pub use vader::SentimentIntensityAnalyzer;
