use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse lifecycle state shown on the admin surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotState {
    Running,
    Scheduled,
    Warning,
    Error,
    Stopped,
}

impl BotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotState::Running => "Running",
            BotState::Scheduled => "Scheduled",
            BotState::Warning => "Warning",
            BotState::Error => "Error",
            BotState::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the append-only bot status log; the newest row wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotStatus {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub next_scheduled_run: Option<DateTime<Utc>>,
    pub message: String,
}
