use std::{sync::Arc, time::Duration as StdDuration};

use agentrun_database::{initialize_database, interfaces::DatabaseImpl, sqlite::SqliteDb};
use agentrun_executor::{Executor, ExecutorSettings};
use agentrun_llm::{CompletionRequest, LlmClient, LlmError};
use agentrun_models::core::{Agent, AgentStatus, AgentType, ExecutionStatus};
use agentrun_scheduler::{config::SchedulerConfig, schedule_check, scheduler_loop};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::Notify;

/// Fails every completion, so only LLM-backed agent types error out.
struct OfflineLlm;

#[async_trait]
impl LlmClient for OfflineLlm {
    fn default_model(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _request: CompletionRequest) -> agentrun_llm::Result<String> {
        Err(LlmError::MissingApiKey)
    }
}

async fn setup() -> (Arc<SqliteDb>, Arc<Executor<SqliteDb>>) {
    let db = Arc::new(SqliteDb::in_memory().await.unwrap());
    initialize_database(&db, &[]).await.unwrap();
    let executor = Arc::new(Executor::new(
        db.clone(),
        Arc::new(OfflineLlm),
        ExecutorSettings::default(),
    ));
    (db, executor)
}

async fn add_agent(
    db: &SqliteDb,
    agent_type: AgentType,
    status: AgentStatus,
    next_run_offset_minutes: i64,
) -> i64 {
    let mut agent = Agent::new(format!("{agent_type}"), agent_type, "*/5 * * * *")
        .with_config(json!({}));
    agent.status = status;
    agent.next_run_at = Some(Utc::now() + Duration::minutes(next_run_offset_minutes));
    db.insert_agent(&agent).await.unwrap()
}

#[tokio::test]
async fn due_agent_gets_last_run_and_advanced_next_run() {
    let (db, executor) = setup().await;
    let id = add_agent(&db, AgentType::InventoryMonitor, AgentStatus::Active, -3).await;
    let now = Utc::now();

    let report = schedule_check(&executor, now).await.unwrap();

    assert_eq!(report.processed(), 1);
    assert!(report.results[0].success);
    let agent = db.fetch_agent(id).await.unwrap().unwrap();
    assert!(agent.last_run_at.unwrap().timestamp() >= now.timestamp());
    assert!(agent.next_run_at.unwrap() > now);
}

#[tokio::test]
async fn only_active_due_agents_are_picked_up() {
    let (db, executor) = setup().await;
    let due = add_agent(&db, AgentType::PriceOptimizer, AgentStatus::Active, -1).await;
    add_agent(&db, AgentType::PriceOptimizer, AgentStatus::Active, 30).await;
    add_agent(&db, AgentType::PriceOptimizer, AgentStatus::Paused, -1).await;
    add_agent(&db, AgentType::PriceOptimizer, AgentStatus::Stopped, -1).await;
    add_agent(&db, AgentType::PriceOptimizer, AgentStatus::Error, -1).await;

    let report = schedule_check(&executor, Utc::now()).await.unwrap();

    let ids: Vec<i64> = report.results.iter().map(|result| result.agent_id).collect();
    assert_eq!(ids, vec![due]);
}

#[tokio::test]
async fn one_failing_agent_does_not_stop_the_rest() {
    let (db, executor) = setup().await;
    let failing = add_agent(&db, AgentType::ContentGenerator, AgentStatus::Active, -10).await;
    let healthy = add_agent(&db, AgentType::EmailCampaign, AgentStatus::Active, -5).await;

    let report = schedule_check(&executor, Utc::now()).await.unwrap();

    assert_eq!(report.processed(), 2);
    assert_eq!(report.failures(), 1);
    let failed = report.results.iter().find(|r| r.agent_id == failing).unwrap();
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().contains("API key"));
    assert!(report.results.iter().any(|r| r.agent_id == healthy && r.success));

    assert_eq!(
        db.fetch_agent(failing).await.unwrap().unwrap().status,
        AgentStatus::Error
    );
    let logs = db.fetch_execution_logs(failing, 10).await.unwrap();
    assert_eq!(
        logs.iter().filter(|log| log.status == ExecutionStatus::Failed).count(),
        1
    );

    // The errored agent is not retried on the next poll.
    let second = schedule_check(&executor, Utc::now()).await.unwrap();
    assert_eq!(second.processed(), 0);
}

#[tokio::test]
async fn scheduler_loop_stops_on_notify() {
    let (_db, executor) = setup().await;
    let notify = Arc::new(Notify::new());
    let config = SchedulerConfig {
        scheduler_frequency_seconds: 1,
    };

    let loop_notify = notify.clone();
    let handle = tokio::spawn(async move {
        scheduler_loop(executor, loop_notify, &config).await;
    });

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    notify.notify_waiters();
    tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("scheduler loop did not stop")
        .unwrap();
}
