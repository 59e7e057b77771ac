use std::{sync::Arc, time::{Duration, Instant}};

use agentrun_database::interfaces::DatabaseImpl;
use agentrun_models::errors::SendableError;
use async_trait::async_trait;
use log::debug;

use crate::{
    Watchdog,
    issues::{Issue, Severity},
};

pub const BACKEND_WATCHDOG: &str = "backend";

/// Checks that the store answers, and answers quickly.
pub struct BackendWatchdog<D: DatabaseImpl> {
    db: Arc<D>,
    interval: Duration,
    slow_threshold: Duration,
}

impl<D: DatabaseImpl> BackendWatchdog<D> {
    pub fn new(db: Arc<D>, interval: Duration) -> Self {
        Self {
            db,
            interval,
            slow_threshold: Duration::from_secs(2),
        }
    }

    pub fn with_slow_threshold(mut self, slow_threshold: Duration) -> Self {
        self.slow_threshold = slow_threshold;
        self
    }
}

#[async_trait]
impl<D: DatabaseImpl> Watchdog for BackendWatchdog<D> {
    fn name(&self) -> &str {
        BACKEND_WATCHDOG
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn check(&self) -> Result<Vec<Issue>, SendableError> {
        let start = Instant::now();
        if let Err(err) = self.db.ping().await {
            return Ok(vec![Issue::new(
                BACKEND_WATCHDOG,
                Severity::Critical,
                format!("Store is unreachable: {err}"),
            )]);
        }

        let elapsed = start.elapsed();
        debug!("Store ping took {} ms", elapsed.as_millis());
        if elapsed > self.slow_threshold {
            return Ok(vec![Issue::new(
                BACKEND_WATCHDOG,
                Severity::Warning,
                format!(
                    "Store ping took {} ms (threshold {} ms)",
                    elapsed.as_millis(),
                    self.slow_threshold.as_millis()
                ),
            )]);
        }
        Ok(Vec::new())
    }
}
