pub mod agents;
pub mod backend;
pub mod issues;
pub mod status;

use std::{sync::Arc, time::Duration};

use agentrun_models::errors::SendableError;
use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use tokio::{sync::Notify, task::JoinHandle, time};

use crate::{
    issues::{Issue, IssueLog, Severity},
    status::{WatchdogHealth, WatchdogStatus},
};

/// A periodic health check. Each watchdog runs on its own task, so a failing
/// or slow checker never holds up the others.
#[async_trait]
pub trait Watchdog: Send + Sync {
    fn name(&self) -> &str;
    fn interval(&self) -> Duration;
    async fn check(&self) -> Result<Vec<Issue>, SendableError>;
}

/// Runs one check and records its issues and health.
pub async fn run_check(watchdog: &dyn Watchdog, issues: &IssueLog, status: &WatchdogStatus) {
    let name = watchdog.name();
    let health = match watchdog.check().await {
        Ok(found) => {
            let issues_found = found.len();
            let healthy = found.iter().all(|issue| issue.severity == Severity::Info);
            for issue in found {
                match issue.severity {
                    Severity::Info => info!("[{}] {}", name, issue.message),
                    _ => warn!("[{}] {}", name, issue.message),
                }
                issues.record(issue);
            }
            WatchdogHealth {
                healthy,
                last_check: Utc::now(),
                issues_found,
                last_error: None,
            }
        }
        Err(err) => {
            error!("Watchdog {} failed: {}", name, err);
            WatchdogHealth {
                healthy: false,
                last_check: Utc::now(),
                issues_found: 0,
                last_error: Some(err.to_string()),
            }
        }
    };
    status.update(name, health);
}

pub fn spawn_watchdog(
    watchdog: Arc<dyn Watchdog>,
    issues: IssueLog,
    status: WatchdogStatus,
    notify: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(watchdog.interval().max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let shutdown = notify.notified();
        tokio::pin!(shutdown);
        info!(
            "Watchdog {} checking every {} seconds",
            watchdog.name(),
            watchdog.interval().as_secs()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    run_check(watchdog.as_ref(), &issues, &status).await;
                }
            }
        }
        info!("Stopped watchdog {}", watchdog.name());
    })
}
