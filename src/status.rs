//! Bot lifecycle status logging for the admin surface.

use crate::domain::BotState;
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::error;

/// Thin wrapper around the bot_status log. Never fails the caller; a
/// logging failure is itself only logged.
#[derive(Clone)]
pub struct StatusLogger {
    store: Arc<dyn Store>,
}

impl StatusLogger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn log(&self, state: BotState, message: &str) {
        self.log_with_next_run(state, message, None).await;
    }

    pub async fn log_with_next_run(
        &self,
        state: BotState,
        message: &str,
        next_run: Option<DateTime<Utc>>,
    ) {
        if let Err(err) = self.store.log_bot_status(state, message, next_run).await {
            error!("Failed to log bot status ({state}: {message}): {err}");
        }
    }
}
