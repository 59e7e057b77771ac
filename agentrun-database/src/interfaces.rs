use std::future::Future;

use agentrun_models::{
    core::{Agent, AgentStatus, ExecutionLock, ExecutionLog},
    errors::SendableError,
};
use chrono::{DateTime, Utc};

// NOTE: Ensure anything that implements this trait cannot contain a reference
// otherwise, this is breaking major rules
pub trait DatabaseImpl: Send + Sync + 'static {
    fn run_init_scripts(&self, paths: &[String]) -> impl Future<Output = Result<(), SendableError>> + Send;
    fn ping(&self) -> impl Future<Output = Result<(), SendableError>> + Send;

    fn insert_agent(&self, agent: &Agent) -> impl Future<Output = Result<i64, SendableError>> + Send;
    fn update_agent(&self, agent: &Agent) -> impl Future<Output = Result<(), SendableError>> + Send;
    fn fetch_agent(&self, agent_id: i64) -> impl Future<Output = Result<Option<Agent>, SendableError>> + Send;
    fn fetch_all_agents(&self) -> impl Future<Output = Result<Vec<Agent>, SendableError>> + Send;
    fn fetch_due_agents(&self, now: DateTime<Utc>) -> impl Future<Output = Result<Vec<Agent>, SendableError>> + Send;
    fn update_agent_status(
        &self,
        agent_id: i64,
        status: AgentStatus,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), SendableError>> + Send;
    /// Records a successful run. An agent in `error` goes back to `active`;
    /// `paused` and `stopped` are left alone.
    fn update_agent_schedule(
        &self,
        agent_id: i64,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), SendableError>> + Send;

    fn insert_execution_log(&self, log: &ExecutionLog) -> impl Future<Output = Result<i64, SendableError>> + Send;
    fn fetch_execution_logs(
        &self,
        agent_id: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ExecutionLog>, SendableError>> + Send;
    fn fetch_execution_logs_between(
        &self,
        start: i64,
        end: i64,
    ) -> impl Future<Output = Result<Vec<ExecutionLog>, SendableError>> + Send;
    fn fetch_latest_execution_log(
        &self,
        agent_id: i64,
    ) -> impl Future<Output = Result<Option<ExecutionLog>, SendableError>> + Send;

    /// Takes the agent's lock when no lock exists or the current one has expired.
    fn try_acquire_lock(
        &self,
        lock: &ExecutionLock,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, SendableError>> + Send;
    fn release_lock(&self, agent_id: i64, execution_id: &str) -> impl Future<Output = Result<(), SendableError>> + Send;
    fn force_release_lock(&self, agent_id: i64) -> impl Future<Output = Result<(), SendableError>> + Send;
}
