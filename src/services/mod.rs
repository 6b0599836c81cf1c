pub mod admin;
pub mod engagement;

pub use admin::AdminServer;
pub use engagement::EngagementUpdater;
