mod error;
pub mod handlers;
pub mod multitask;
pub mod schedule;
pub mod thinking;

use std::{sync::Arc, time::Instant};

use agentrun_database::interfaces::DatabaseImpl;
use agentrun_llm::LlmClient;
use agentrun_models::core::{Agent, AgentStatus, ExecutionLock, ExecutionLog, ExecutionStatus};
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use serde_json::{Value, json};
use uuid::Uuid;

pub use error::ExecutorError;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    Standard,
    DeepThink,
    Multitask { tasks: Vec<String> },
}

impl ExecutionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Standard => "standard",
            ExecutionMode::DeepThink => "deep_think",
            ExecutionMode::Multitask { .. } => "multitask",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub lock_ttl: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::minutes(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub execution_id: String,
    pub agent_id: i64,
    pub result: Value,
    pub duration_ms: i64,
    pub next_run_at: DateTime<Utc>,
}

pub struct Executor<D: DatabaseImpl> {
    db: Arc<D>,
    llm: Arc<dyn LlmClient>,
    settings: ExecutorSettings,
}

impl<D: DatabaseImpl> Executor<D> {
    pub fn new(db: Arc<D>, llm: Arc<dyn LlmClient>, settings: ExecutorSettings) -> Self {
        Self { db, llm, settings }
    }

    pub fn db(&self) -> &Arc<D> {
        &self.db
    }

    /// Runs one agent under its execution lock. A missing agent or a held lock
    /// fails before anything is logged; every other failure is recorded as a
    /// single `failed` log and leaves the agent in `error`.
    pub async fn execute(
        &self,
        agent_id: i64,
        mode: ExecutionMode,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let agent = self
            .db
            .fetch_agent(agent_id)
            .await?
            .ok_or(ExecutorError::AgentNotFound(agent_id))?;

        let execution_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let lock = ExecutionLock {
            agent_id,
            execution_id: execution_id.clone(),
            expires_at: now + self.settings.lock_ttl,
        };
        if !self.db.try_acquire_lock(&lock, now).await? {
            warn!("Agent {} ({}) is already running", agent.name, agent_id);
            return Err(ExecutorError::AlreadyRunning(agent_id));
        }

        let outcome = self.run_locked(&agent, agent_id, &execution_id, mode).await;

        if let Err(err) = self.db.release_lock(agent_id, &execution_id).await {
            error!("Failed to release lock for agent {}: {}", agent_id, err);
        }
        outcome
    }

    async fn run_locked(
        &self,
        agent: &Agent,
        agent_id: i64,
        execution_id: &str,
        mode: ExecutionMode,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        info!(
            "Executing agent {} ({}, {}) in {} mode",
            agent.name,
            agent_id,
            agent.agent_type,
            mode.name()
        );
        self.db
            .insert_execution_log(&ExecutionLog::new(
                agent_id,
                execution_id,
                ExecutionStatus::Started,
                json!({ "mode": mode.name() }),
                0,
            ))
            .await?;

        let start = Instant::now();
        let result = self.run_body(agent, mode).await.and_then(|result| {
            let next_run_at = schedule::next_run_after(&agent.schedule, Utc::now())?;
            Ok((result, next_run_at))
        });
        let duration_ms = start.elapsed().as_millis() as i64;

        let persisted = match result {
            Ok((result, next_run_at)) => {
                self.record_success(agent_id, execution_id, result, duration_ms, next_run_at)
                    .await
            }
            Err(err) => Err(err),
        };

        match persisted {
            Ok(outcome) => {
                info!(
                    "Agent {} completed in {} ms, next run at {}",
                    agent_id, duration_ms, outcome.next_run_at
                );
                Ok(outcome)
            }
            Err(err) => {
                self.record_failure(agent_id, execution_id, &err, duration_ms).await;
                Err(err)
            }
        }
    }

    /// A store error here still counts as a failed run, even when the
    /// `completed` row already landed.
    async fn record_success(
        &self,
        agent_id: i64,
        execution_id: &str,
        result: Value,
        duration_ms: i64,
        next_run_at: DateTime<Utc>,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        self.db
            .insert_execution_log(&ExecutionLog::new(
                agent_id,
                execution_id,
                ExecutionStatus::Completed,
                result.clone(),
                duration_ms,
            ))
            .await?;
        let now = Utc::now();
        self.db
            .update_agent_schedule(agent_id, now, Some(next_run_at), now)
            .await?;
        Ok(ExecutionOutcome {
            execution_id: execution_id.to_string(),
            agent_id,
            result,
            duration_ms,
            next_run_at,
        })
    }

    async fn run_body(&self, agent: &Agent, mode: ExecutionMode) -> Result<Value, ExecutorError> {
        let settings = agent.settings();
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| self.llm.default_model().to_string());

        let thinking = if mode == ExecutionMode::DeepThink || settings.enable_deep_thinking {
            Some(thinking::think(agent, self.llm.as_ref(), &model, settings.max_thinking_depth).await?)
        } else {
            None
        };
        let context = thinking.as_ref().map(|steps| steps.join("\n"));

        let output = match mode {
            ExecutionMode::Multitask { tasks } => {
                let tasks = if tasks.is_empty() {
                    multitask::default_tasks(agent.agent_type)
                } else {
                    tasks
                };
                let report =
                    multitask::run_batched(agent.agent_type, tasks, settings.max_parallel_tasks).await;
                json!(report)
            }
            _ if settings.enable_multitasking => {
                let report = multitask::run_batched(
                    agent.agent_type,
                    multitask::default_tasks(agent.agent_type),
                    settings.max_parallel_tasks,
                )
                .await;
                json!(report)
            }
            _ => handlers::run_handler(agent, self.llm.as_ref(), &model, context.as_deref()).await?,
        };

        let mut result = json!({
            "agent_type": agent.agent_type,
            "output": output,
        });
        if let Some(steps) = thinking {
            result["thinking"] = json!(steps);
        }
        Ok(result)
    }

    async fn record_failure(
        &self,
        agent_id: i64,
        execution_id: &str,
        err: &ExecutorError,
        duration_ms: i64,
    ) {
        error!("Agent {} failed: {}", agent_id, err);
        let log = ExecutionLog::new(
            agent_id,
            execution_id,
            ExecutionStatus::Failed,
            json!({ "error": err.to_string() }),
            duration_ms,
        );
        if let Err(log_err) = self.db.insert_execution_log(&log).await {
            error!("Failed to record failure for agent {}: {}", agent_id, log_err);
        }
        if let Err(status_err) = self
            .db
            .update_agent_status(agent_id, AgentStatus::Error, Utc::now())
            .await
        {
            error!("Failed to mark agent {} as errored: {}", agent_id, status_err);
        }
    }
}
