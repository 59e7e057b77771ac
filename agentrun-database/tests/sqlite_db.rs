use std::sync::Arc;

use agentrun_database::{initialize_database, interfaces::DatabaseImpl, sqlite::SqliteDb};
use agentrun_models::core::{
    Agent, AgentStatus, AgentType, ExecutionLock, ExecutionLog, ExecutionStatus,
};
use chrono::{Duration, Utc};
use serde_json::json;

async fn open_db() -> Arc<SqliteDb> {
    let db = Arc::new(SqliteDb::in_memory().await.unwrap());
    initialize_database(&db, &[]).await.unwrap();
    db
}

async fn insert(db: &SqliteDb, name: &str, status: AgentStatus, next_run_offset: Option<i64>) -> i64 {
    let mut agent = Agent::new(name, AgentType::InventoryMonitor, "*/5 * * * *")
        .with_config(json!({ "low_stock_threshold": 4 }));
    agent.status = status;
    agent.next_run_at = next_run_offset.map(|secs| Utc::now() + Duration::seconds(secs));
    db.insert_agent(&agent).await.unwrap()
}

#[tokio::test]
async fn inserted_agent_reads_back_with_config() {
    let db = open_db().await;
    let id = insert(&db, "Restock", AgentStatus::Active, Some(60)).await;

    let agent = db.fetch_agent(id).await.unwrap().unwrap();
    assert_eq!(agent.id, Some(id));
    assert_eq!(agent.name, "Restock");
    assert_eq!(agent.agent_type, AgentType::InventoryMonitor);
    assert_eq!(agent.config["low_stock_threshold"], 4);
    assert!(agent.next_run_at.is_some());

    assert!(db.fetch_agent(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn due_agents_are_active_with_past_next_run() {
    let db = open_db().await;
    let due = insert(&db, "due", AgentStatus::Active, Some(-120)).await;
    insert(&db, "future", AgentStatus::Active, Some(3600)).await;
    insert(&db, "paused", AgentStatus::Paused, Some(-120)).await;
    insert(&db, "errored", AgentStatus::Error, Some(-120)).await;
    insert(&db, "unscheduled", AgentStatus::Active, None).await;

    let agents = db.fetch_due_agents(Utc::now()).await.unwrap();
    let ids: Vec<i64> = agents.iter().filter_map(|agent| agent.id).collect();
    assert_eq!(ids, vec![due]);
}

#[tokio::test]
async fn status_and_schedule_updates_persist() {
    let db = open_db().await;
    let id = insert(&db, "toggle", AgentStatus::Active, Some(-10)).await;
    let now = Utc::now();

    db.update_agent_status(id, AgentStatus::Paused, now).await.unwrap();
    let next = now + Duration::minutes(5);
    db.update_agent_schedule(id, now, Some(next), now).await.unwrap();

    let agent = db.fetch_agent(id).await.unwrap().unwrap();
    assert_eq!(agent.status, AgentStatus::Paused);
    assert_eq!(agent.last_run_at.map(|dt| dt.timestamp()), Some(now.timestamp()));
    assert_eq!(agent.next_run_at.map(|dt| dt.timestamp()), Some(next.timestamp()));
}

#[tokio::test]
async fn schedule_update_clears_error_status() {
    let db = open_db().await;
    let id = insert(&db, "recovered", AgentStatus::Error, Some(-10)).await;
    let now = Utc::now();

    db.update_agent_schedule(id, now, Some(now + Duration::minutes(5)), now)
        .await
        .unwrap();

    assert_eq!(db.fetch_agent(id).await.unwrap().unwrap().status, AgentStatus::Active);
}

#[tokio::test]
async fn execution_logs_are_returned_newest_first() {
    let db = open_db().await;
    let id = insert(&db, "logged", AgentStatus::Active, None).await;

    db.insert_execution_log(&ExecutionLog::new(id, "exec-1", ExecutionStatus::Started, json!({}), 0))
        .await
        .unwrap();
    db.insert_execution_log(&ExecutionLog::new(
        id,
        "exec-1",
        ExecutionStatus::Completed,
        json!({ "low_stock_items": [] }),
        42,
    ))
    .await
    .unwrap();

    let logs = db.fetch_execution_logs(id, 10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].status, ExecutionStatus::Completed);
    assert_eq!(logs[0].duration_ms, 42);
    assert_eq!(logs[1].status, ExecutionStatus::Started);

    let latest = db.fetch_latest_execution_log(id).await.unwrap().unwrap();
    assert_eq!(latest.status, ExecutionStatus::Completed);

    let window = db
        .fetch_execution_logs_between(Utc::now().timestamp() - 60, Utc::now().timestamp() + 60)
        .await
        .unwrap();
    assert_eq!(window.len(), 2);
}

#[tokio::test]
async fn lock_blocks_until_released_or_expired() {
    let db = open_db().await;
    let id = insert(&db, "locked", AgentStatus::Active, None).await;
    let now = Utc::now();

    let first = ExecutionLock {
        agent_id: id,
        execution_id: "first".into(),
        expires_at: now + Duration::minutes(10),
    };
    let second = ExecutionLock {
        execution_id: "second".into(),
        ..first.clone()
    };

    assert!(db.try_acquire_lock(&first, now).await.unwrap());
    assert!(!db.try_acquire_lock(&second, now).await.unwrap());

    // Releasing with someone else's execution id leaves the lock in place.
    db.release_lock(id, "second").await.unwrap();
    assert!(!db.try_acquire_lock(&second, now).await.unwrap());

    db.release_lock(id, "first").await.unwrap();
    assert!(db.try_acquire_lock(&second, now).await.unwrap());

    let later = now + Duration::minutes(11);
    let third = ExecutionLock {
        agent_id: id,
        execution_id: "third".into(),
        expires_at: later + Duration::minutes(10),
    };
    assert!(db.try_acquire_lock(&third, later).await.unwrap());

    db.force_release_lock(id).await.unwrap();
    assert!(db.try_acquire_lock(&first, now).await.unwrap());
}

#[tokio::test]
async fn ping_succeeds_on_open_pool() {
    let db = open_db().await;
    db.ping().await.unwrap();
}
