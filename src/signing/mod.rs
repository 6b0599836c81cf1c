pub mod oauth1;

pub use oauth1::OAuth1Credentials;
