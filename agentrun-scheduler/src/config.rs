use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub scheduler_frequency_seconds: u64,
}

impl SchedulerConfig {
    pub fn frequency(&self) -> Duration {
        Duration::from_secs(self.scheduler_frequency_seconds.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_frequency_seconds: 60,
        }
    }
}
