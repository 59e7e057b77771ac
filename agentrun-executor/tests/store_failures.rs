use std::sync::Arc;

use agentrun_database::{initialize_database, interfaces::DatabaseImpl, sqlite::SqliteDb};
use agentrun_executor::{ExecutionMode, Executor, ExecutorError, ExecutorSettings};
use agentrun_llm::{CompletionRequest, LlmClient};
use agentrun_models::{
    core::{Agent, AgentStatus, AgentType, ExecutionLock, ExecutionLog, ExecutionStatus},
    errors::SendableError,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

struct UnusedLlm;

#[async_trait]
impl LlmClient for UnusedLlm {
    fn default_model(&self) -> &str {
        "unused"
    }

    async fn complete(&self, _request: CompletionRequest) -> agentrun_llm::Result<String> {
        Ok(String::new())
    }
}

/// SQLite store that refuses to record schedule advances.
struct ScheduleRejectingDb {
    inner: SqliteDb,
}

impl DatabaseImpl for ScheduleRejectingDb {
    async fn run_init_scripts(&self, paths: &[String]) -> Result<(), SendableError> {
        self.inner.run_init_scripts(paths).await
    }

    async fn ping(&self) -> Result<(), SendableError> {
        self.inner.ping().await
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<i64, SendableError> {
        self.inner.insert_agent(agent).await
    }

    async fn update_agent(&self, agent: &Agent) -> Result<(), SendableError> {
        self.inner.update_agent(agent).await
    }

    async fn fetch_agent(&self, agent_id: i64) -> Result<Option<Agent>, SendableError> {
        self.inner.fetch_agent(agent_id).await
    }

    async fn fetch_all_agents(&self) -> Result<Vec<Agent>, SendableError> {
        self.inner.fetch_all_agents().await
    }

    async fn fetch_due_agents(&self, now: DateTime<Utc>) -> Result<Vec<Agent>, SendableError> {
        self.inner.fetch_due_agents(now).await
    }

    async fn update_agent_status(
        &self,
        agent_id: i64,
        status: AgentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        self.inner.update_agent_status(agent_id, status, now).await
    }

    async fn update_agent_schedule(
        &self,
        _agent_id: i64,
        _last_run_at: DateTime<Utc>,
        _next_run_at: Option<DateTime<Utc>>,
        _now: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        Err("ai_agents is read-only".into())
    }

    async fn insert_execution_log(&self, log: &ExecutionLog) -> Result<i64, SendableError> {
        self.inner.insert_execution_log(log).await
    }

    async fn fetch_execution_logs(
        &self,
        agent_id: i64,
        limit: i64,
    ) -> Result<Vec<ExecutionLog>, SendableError> {
        self.inner.fetch_execution_logs(agent_id, limit).await
    }

    async fn fetch_execution_logs_between(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<ExecutionLog>, SendableError> {
        self.inner.fetch_execution_logs_between(start, end).await
    }

    async fn fetch_latest_execution_log(
        &self,
        agent_id: i64,
    ) -> Result<Option<ExecutionLog>, SendableError> {
        self.inner.fetch_latest_execution_log(agent_id).await
    }

    async fn try_acquire_lock(
        &self,
        lock: &ExecutionLock,
        now: DateTime<Utc>,
    ) -> Result<bool, SendableError> {
        self.inner.try_acquire_lock(lock, now).await
    }

    async fn release_lock(&self, agent_id: i64, execution_id: &str) -> Result<(), SendableError> {
        self.inner.release_lock(agent_id, execution_id).await
    }

    async fn force_release_lock(&self, agent_id: i64) -> Result<(), SendableError> {
        self.inner.force_release_lock(agent_id).await
    }
}

#[tokio::test]
async fn store_error_after_the_body_is_recorded_as_a_failure() {
    let db = Arc::new(ScheduleRejectingDb {
        inner: SqliteDb::in_memory().await.unwrap(),
    });
    initialize_database(&db, &[]).await.unwrap();
    let mut agent = Agent::new("stock check", AgentType::InventoryMonitor, "*/5 * * * *");
    agent.next_run_at = Some(Utc::now() - Duration::minutes(1));
    let id = db.insert_agent(&agent).await.unwrap();
    let executor = Executor::new(db.clone(), Arc::new(UnusedLlm), ExecutorSettings::default());

    let err = executor.execute(id, ExecutionMode::Standard).await.unwrap_err();

    assert!(matches!(err, ExecutorError::Database(_)));
    let logs = db.fetch_execution_logs(id, 10).await.unwrap();
    let failed: Vec<_> = logs
        .iter()
        .filter(|log| log.status == ExecutionStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].result["error"].as_str().unwrap().contains("read-only"));
    assert_eq!(db.fetch_agent(id).await.unwrap().unwrap().status, AgentStatus::Error);

    // The lock was still released.
    executor.execute(id, ExecutionMode::Standard).await.unwrap_err();
    assert_eq!(
        db.fetch_execution_logs(id, 10)
            .await
            .unwrap()
            .iter()
            .filter(|log| log.status == ExecutionStatus::Failed)
            .count(),
        2
    );
}
