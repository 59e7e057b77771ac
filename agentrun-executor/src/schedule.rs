use chrono::{DateTime, Utc};
use croner::Cron;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid schedule '{schedule}': {message}")]
pub struct ScheduleError {
    pub schedule: String,
    pub message: String,
}

/// Next cron occurrence strictly after `after`.
pub fn next_run_after(schedule: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
    let invalid = |message: String| ScheduleError {
        schedule: schedule.to_string(),
        message,
    };
    let cron = Cron::new(schedule.trim())
        .parse()
        .map_err(|err| invalid(err.to_string()))?;
    cron.find_next_occurrence(&after, false)
        .map_err(|err| invalid(err.to_string()))
}
