pub mod config;

use std::{sync::Arc, time};

use agentrun_database::interfaces::DatabaseImpl;
use agentrun_executor::{ExecutionMode, Executor};
use agentrun_models::{
    errors::SendableError,
    web::{AgentRunResult, ScheduleCheckResponse},
};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::Notify;

use crate::config::SchedulerConfig;

#[derive(Debug, Clone, Default)]
pub struct ScheduleCheckReport {
    pub results: Vec<AgentRunResult>,
}

impl ScheduleCheckReport {
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|result| !result.success).count()
    }
}

impl From<ScheduleCheckReport> for ScheduleCheckResponse {
    fn from(report: ScheduleCheckReport) -> Self {
        ScheduleCheckResponse {
            success: true,
            processed: report.processed(),
            results: report.results,
        }
    }
}

/// Runs every active agent whose `next_run_at` has passed, one at a time.
/// A failing agent is reported and the remaining agents still run.
pub async fn schedule_check<D: DatabaseImpl>(
    executor: &Executor<D>,
    now: DateTime<Utc>,
) -> Result<ScheduleCheckReport, SendableError> {
    debug!("Fetching due agents");
    let agents = executor.db().fetch_due_agents(now).await?;

    let mut report = ScheduleCheckReport::default();
    for agent in agents {
        let Some(agent_id) = agent.id else {
            warn!("Skipping due agent '{}' without an id", agent.name);
            continue;
        };

        let result = match executor.execute(agent_id, ExecutionMode::Standard).await {
            Ok(outcome) => AgentRunResult {
                agent_id,
                success: true,
                execution_id: Some(outcome.execution_id),
                error: None,
            },
            Err(err) => {
                warn!("Scheduled run of agent {} failed: {}", agent_id, err);
                AgentRunResult {
                    agent_id,
                    success: false,
                    execution_id: None,
                    error: Some(err.to_string()),
                }
            }
        };
        report.results.push(result);
    }

    Ok(report)
}

pub async fn scheduler_loop<D: DatabaseImpl>(
    executor: Arc<Executor<D>>,
    notify: Arc<Notify>,
    config: &SchedulerConfig,
) {
    let shutdown = notify.notified();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Scheduler received shutdown signal.");
                break;
            }
            _ = tokio::time::sleep(config.frequency()) => {
                let start = time::Instant::now();
                match schedule_check(&executor, Utc::now()).await {
                    Ok(report) => info!(
                        "Scheduler ran {} agent(s), {} failed, in {:.3} seconds",
                        report.processed(),
                        report.failures(),
                        start.elapsed().as_secs_f64()
                    ),
                    Err(err) => error!("Scheduler iteration failed: {}", err),
                }
            }
        }
    }
}
