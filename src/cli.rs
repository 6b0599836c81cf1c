use clap::{Parser, Subcommand};

/// Scheduled Bitcoin price and news publisher
#[derive(Parser)]
#[command(name = "btcbuzzbot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot: scheduler, news pipeline and admin surface
    Run,
    /// Run a single publish cycle immediately
    PostNow {
        /// Label recorded for this manual cycle
        #[arg(long, default_value = "manual")]
        label: String,
    },
    /// Run one news fetch cycle
    FetchNews,
    /// Run one news analysis cycle
    AnalyzeNews,
    /// Show or update the posting schedule
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
    /// Manage curated quotes
    Quote {
        #[command(subcommand)]
        command: ContentCommands,
    },
    /// Manage curated jokes
    Joke {
        #[command(subcommand)]
        command: ContentCommands,
    },
    /// Show the latest bot status
    Status,
}

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Print the stored schedule
    Show,
    /// Replace the schedule with a comma-separated list of HH:MM UTC times
    Set {
        /// e.g. "08:00,12:00,16:00,20:00"
        times: String,
    },
}

#[derive(Subcommand)]
pub enum ContentCommands {
    /// Add a new item
    Add {
        text: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// List all items
    List,
    /// Delete an item by id
    Delete { id: i64 },
}
