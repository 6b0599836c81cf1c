//! In-process job scheduling: daily tweet jobs from the configured
//! wall-clock times plus fixed-interval news and engagement jobs.

pub mod engine;

pub use engine::{JobContext, SchedulerEngine};

use tracing::warn;

/// Stable id prefix for the daily tweet jobs
pub const TWEET_JOB_PREFIX: &str = "scheduled_tweet_";

/// One "HH:MM" UTC wall-clock posting time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    pub hour: u8,
    pub minute: u8,
}

impl ScheduleTime {
    pub fn parse(s: &str) -> Option<Self> {
        let (hour, minute) = s.trim().split_once(':')?;
        let hour: u8 = hour.trim().parse().ok()?;
        let minute: u8 = minute.trim().parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    /// `HH:MM`
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// Stable job id, e.g. `scheduled_tweet_0800`
    pub fn job_id(&self) -> String {
        format!("{TWEET_JOB_PREFIX}{:02}{:02}", self.hour, self.minute)
    }

    /// Six-field cron expression firing daily at this UTC minute
    pub fn cron_expr(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

/// Parse a comma-separated "HH:MM" list, skipping invalid entries with a
/// warning.
pub fn parse_schedule(schedule: &str) -> Vec<ScheduleTime> {
    schedule
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|raw| match ScheduleTime::parse(raw) {
            Some(time) => Some(time),
            None => {
                warn!("Invalid time '{}' in schedule, skipping", raw.trim());
                None
            }
        })
        .collect()
}

/// Normalize a schedule string to sorted, zero-padded "HH:MM" entries.
pub fn normalize_schedule(schedule: &str) -> String {
    let mut times = parse_schedule(schedule);
    times.sort_by_key(|t| (t.hour, t.minute));
    times
        .iter()
        .map(ScheduleTime::label)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_times() {
        let times = parse_schedule("08:00,12:30, 23:59");
        assert_eq!(times.len(), 3);
        assert_eq!(times[0], ScheduleTime { hour: 8, minute: 0 });
        assert_eq!(times[2], ScheduleTime { hour: 23, minute: 59 });
    }

    #[test]
    fn skips_invalid_entries() {
        let times = parse_schedule("25:00,banana,12:61,09:30,,");
        assert_eq!(times, vec![ScheduleTime { hour: 9, minute: 30 }]);
    }

    #[test]
    fn job_ids_are_stable_and_prefixed() {
        let time = ScheduleTime::parse("07:05").unwrap();
        assert_eq!(time.job_id(), "scheduled_tweet_0705");
        assert_eq!(time.label(), "07:05");
        assert_eq!(time.cron_expr(), "0 5 7 * * *");
    }

    #[test]
    fn normalizes_ordering_and_padding() {
        assert_eq!(normalize_schedule("19:00,7:0"), "07:00,19:00");
        assert_eq!(normalize_schedule(""), "");
    }
}
