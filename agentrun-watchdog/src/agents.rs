use std::{sync::Arc, time::Duration};

use agentrun_database::interfaces::DatabaseImpl;
use agentrun_models::{
    core::{Agent, AgentStatus, ExecutionLog, ExecutionStatus},
    errors::SendableError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use crate::{
    Watchdog,
    issues::{Issue, Severity},
};

pub const AGENT_WATCHDOG: &str = "agents";

#[derive(Debug, Clone)]
pub struct AgentWatchdogSettings {
    pub interval: Duration,
    /// A `started` log older than this with no later log is treated as a dead run.
    pub stuck_after: chrono::Duration,
    /// `None` leaves errored agents alone until someone changes their status.
    pub error_reset_after: Option<chrono::Duration>,
    pub overdue_after: chrono::Duration,
}

impl Default for AgentWatchdogSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(45),
            stuck_after: chrono::Duration::minutes(15),
            error_reset_after: Some(chrono::Duration::hours(1)),
            overdue_after: chrono::Duration::minutes(5),
        }
    }
}

pub struct AgentWatchdog<D: DatabaseImpl> {
    db: Arc<D>,
    settings: AgentWatchdogSettings,
}

impl<D: DatabaseImpl> AgentWatchdog<D> {
    pub fn new(db: Arc<D>, settings: AgentWatchdogSettings) -> Self {
        Self { db, settings }
    }

    /// Walks every agent once. Stuck and long-errored agents are put back to
    /// `active` with a `reset` log; overdue agents are only reported.
    pub async fn inspect(&self, now: DateTime<Utc>) -> Result<Vec<Issue>, SendableError> {
        let mut issues = Vec::new();
        for agent in self.db.fetch_all_agents().await? {
            let Some(agent_id) = agent.id else {
                continue;
            };

            if let Some(issue) = self.reset_if_stuck(&agent, agent_id, now).await? {
                issues.push(issue);
            } else if let Some(issue) = self.reset_if_errored(&agent, agent_id, now).await? {
                issues.push(issue);
            } else if let Some(issue) = self.overdue(&agent, agent_id, now) {
                issues.push(issue);
            }
        }
        Ok(issues)
    }

    async fn reset_if_stuck(
        &self,
        agent: &Agent,
        agent_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Issue>, SendableError> {
        let Some(latest) = self.db.fetch_latest_execution_log(agent_id).await? else {
            return Ok(None);
        };
        if latest.status != ExecutionStatus::Started
            || latest.created_at > now - self.settings.stuck_after
        {
            return Ok(None);
        }

        warn!(
            "Agent {} ({}) has been running since {}, resetting",
            agent.name, agent_id, latest.created_at
        );
        self.db
            .insert_execution_log(&ExecutionLog::new(
                agent_id,
                latest.execution_id.clone(),
                ExecutionStatus::Reset,
                json!({ "reason": "stuck", "started_at": latest.created_at }),
                (now - latest.created_at).num_milliseconds(),
            ))
            .await?;
        self.db.force_release_lock(agent_id).await?;
        // A user toggle to paused or stopped outlives the dead run.
        if matches!(agent.status, AgentStatus::Active | AgentStatus::Error) {
            self.db
                .update_agent_status(agent_id, AgentStatus::Active, now)
                .await?;
        }

        Ok(Some(
            Issue::new(
                AGENT_WATCHDOG,
                Severity::Warning,
                format!(
                    "Agent '{}' was stuck in execution {} and has been reset",
                    agent.name, latest.execution_id
                ),
            )
            .for_agent(agent_id),
        ))
    }

    async fn reset_if_errored(
        &self,
        agent: &Agent,
        agent_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Issue>, SendableError> {
        let Some(reset_after) = self.settings.error_reset_after else {
            return Ok(None);
        };
        if agent.status != AgentStatus::Error || agent.updated_at > now - reset_after {
            return Ok(None);
        }

        info!("Re-activating agent {} ({}) after error", agent.name, agent_id);
        self.db
            .insert_execution_log(&ExecutionLog::new(
                agent_id,
                Uuid::new_v4().to_string(),
                ExecutionStatus::Reset,
                json!({ "reason": "error_timeout", "errored_since": agent.updated_at }),
                0,
            ))
            .await?;
        self.db
            .update_agent_status(agent_id, AgentStatus::Active, now)
            .await?;

        Ok(Some(
            Issue::new(
                AGENT_WATCHDOG,
                Severity::Info,
                format!("Agent '{}' left the error state and will run again", agent.name),
            )
            .for_agent(agent_id),
        ))
    }

    fn overdue(&self, agent: &Agent, agent_id: i64, now: DateTime<Utc>) -> Option<Issue> {
        let next_run_at = agent.next_run_at?;
        if agent.status != AgentStatus::Active || next_run_at > now - self.settings.overdue_after {
            return None;
        }
        Some(
            Issue::new(
                AGENT_WATCHDOG,
                Severity::Warning,
                format!(
                    "Agent '{}' is overdue: next run was due at {}",
                    agent.name, next_run_at
                ),
            )
            .for_agent(agent_id),
        )
    }
}

#[async_trait]
impl<D: DatabaseImpl> Watchdog for AgentWatchdog<D> {
    fn name(&self) -> &str {
        AGENT_WATCHDOG
    }

    fn interval(&self) -> Duration {
        self.settings.interval
    }

    async fn check(&self) -> Result<Vec<Issue>, SendableError> {
        self.inspect(Utc::now()).await
    }
}
