use std::{sync::Arc, time::Duration as StdDuration};

use agentrun_database::{initialize_database, interfaces::DatabaseImpl, sqlite::SqliteDb};
use agentrun_models::core::{
    Agent, AgentStatus, AgentType, ExecutionLock, ExecutionLog, ExecutionStatus,
};
use agentrun_watchdog::{
    Watchdog,
    agents::{AgentWatchdog, AgentWatchdogSettings},
    backend::BackendWatchdog,
    issues::{IssueLog, Severity},
    run_check, spawn_watchdog,
    status::WatchdogStatus,
};
use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::Notify;

async fn setup() -> Arc<SqliteDb> {
    let db = Arc::new(SqliteDb::in_memory().await.unwrap());
    initialize_database(&db, &[]).await.unwrap();
    db
}

async fn add_agent(db: &SqliteDb, status: AgentStatus, minutes_since_update: i64) -> i64 {
    let mut agent = Agent::new("watched", AgentType::InventoryMonitor, "*/5 * * * *");
    agent.status = status;
    agent.updated_at = Utc::now() - Duration::minutes(minutes_since_update);
    agent.next_run_at = Some(Utc::now() + Duration::minutes(5));
    db.insert_agent(&agent).await.unwrap()
}

fn watchdog(db: &Arc<SqliteDb>) -> AgentWatchdog<SqliteDb> {
    AgentWatchdog::new(db.clone(), AgentWatchdogSettings::default())
}

#[tokio::test]
async fn stuck_run_is_reset_and_unlocked() {
    let db = setup().await;
    let id = add_agent(&db, AgentStatus::Active, 30).await;
    let mut started = ExecutionLog::new(id, "dead-run", ExecutionStatus::Started, json!({}), 0);
    started.created_at = Utc::now() - Duration::minutes(20);
    db.insert_execution_log(&started).await.unwrap();
    let now = Utc::now();
    let lock = ExecutionLock {
        agent_id: id,
        execution_id: "dead-run".into(),
        expires_at: now + Duration::minutes(10),
    };
    assert!(db.try_acquire_lock(&lock, now).await.unwrap());

    let issues = watchdog(&db).inspect(Utc::now()).await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].agent_id, Some(id));
    let latest = db.fetch_latest_execution_log(id).await.unwrap().unwrap();
    assert_eq!(latest.status, ExecutionStatus::Reset);
    assert_eq!(latest.execution_id, "dead-run");
    assert_eq!(latest.result["reason"], "stuck");

    let fresh = ExecutionLock {
        agent_id: id,
        execution_id: "next-run".into(),
        expires_at: now + Duration::minutes(10),
    };
    assert!(db.try_acquire_lock(&fresh, Utc::now()).await.unwrap());
}

#[tokio::test]
async fn stuck_run_of_a_paused_agent_keeps_it_paused() {
    let db = setup().await;
    let id = add_agent(&db, AgentStatus::Paused, 30).await;
    let mut started = ExecutionLog::new(id, "dead-run", ExecutionStatus::Started, json!({}), 0);
    started.created_at = Utc::now() - Duration::minutes(20);
    db.insert_execution_log(&started).await.unwrap();
    let now = Utc::now();
    let lock = ExecutionLock {
        agent_id: id,
        execution_id: "dead-run".into(),
        expires_at: now + Duration::minutes(10),
    };
    assert!(db.try_acquire_lock(&lock, now).await.unwrap());

    let issues = watchdog(&db).inspect(Utc::now()).await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(db.fetch_agent(id).await.unwrap().unwrap().status, AgentStatus::Paused);
    let latest = db.fetch_latest_execution_log(id).await.unwrap().unwrap();
    assert_eq!(latest.status, ExecutionStatus::Reset);
    let fresh = ExecutionLock {
        agent_id: id,
        execution_id: "next-run".into(),
        expires_at: now + Duration::minutes(10),
    };
    assert!(db.try_acquire_lock(&fresh, Utc::now()).await.unwrap());
    assert!(db.fetch_due_agents(Utc::now() + Duration::hours(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn recent_started_run_is_left_alone() {
    let db = setup().await;
    let id = add_agent(&db, AgentStatus::Active, 0).await;
    db.insert_execution_log(&ExecutionLog::new(
        id,
        "live-run",
        ExecutionStatus::Started,
        json!({}),
        0,
    ))
    .await
    .unwrap();

    let issues = watchdog(&db).inspect(Utc::now()).await.unwrap();

    assert!(issues.is_empty());
    let latest = db.fetch_latest_execution_log(id).await.unwrap().unwrap();
    assert_eq!(latest.status, ExecutionStatus::Started);
}

#[tokio::test]
async fn long_errored_agent_is_reactivated() {
    let db = setup().await;
    let old = add_agent(&db, AgentStatus::Error, 120).await;
    let recent = add_agent(&db, AgentStatus::Error, 5).await;

    let issues = watchdog(&db).inspect(Utc::now()).await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Info);
    assert_eq!(db.fetch_agent(old).await.unwrap().unwrap().status, AgentStatus::Active);
    assert_eq!(db.fetch_agent(recent).await.unwrap().unwrap().status, AgentStatus::Error);
    let logs = db.fetch_execution_logs(old, 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, ExecutionStatus::Reset);
}

#[tokio::test]
async fn error_reset_can_be_disabled() {
    let db = setup().await;
    let id = add_agent(&db, AgentStatus::Error, 600).await;
    let settings = AgentWatchdogSettings {
        error_reset_after: None,
        ..AgentWatchdogSettings::default()
    };

    let issues = AgentWatchdog::new(db.clone(), settings)
        .inspect(Utc::now())
        .await
        .unwrap();

    assert!(issues.is_empty());
    assert_eq!(db.fetch_agent(id).await.unwrap().unwrap().status, AgentStatus::Error);
}

#[tokio::test]
async fn overdue_agent_is_reported_without_changes() {
    let db = setup().await;
    let mut agent = Agent::new("late", AgentType::EmailCampaign, "0 * * * *");
    agent.next_run_at = Some(Utc::now() - Duration::minutes(30));
    let id = db.insert_agent(&agent).await.unwrap();
    let mut paused = agent.clone();
    paused.status = AgentStatus::Paused;
    db.insert_agent(&paused).await.unwrap();

    let issues = watchdog(&db).inspect(Utc::now()).await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].agent_id, Some(id));
    assert!(issues[0].message.contains("overdue"));
    assert!(db.fetch_execution_logs(id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn run_check_records_health_and_issues() {
    let db = setup().await;
    let mut agent = Agent::new("late", AgentType::SeoOptimizer, "0 * * * *");
    agent.next_run_at = Some(Utc::now() - Duration::hours(2));
    db.insert_agent(&agent).await.unwrap();
    let issues = IssueLog::new(10);
    let status = WatchdogStatus::new();

    let agents = watchdog(&db);
    run_check(&agents, &issues, &status).await;
    let backend = BackendWatchdog::new(db.clone(), StdDuration::from_secs(30));
    run_check(&backend, &issues, &status).await;

    assert_eq!(issues.len(), 1);
    let agent_health = status.get(agents.name()).unwrap();
    assert!(!agent_health.healthy);
    assert_eq!(agent_health.issues_found, 1);
    assert!(status.get(backend.name()).unwrap().healthy);
    assert!(!status.all_healthy());
}

#[tokio::test]
async fn self_heal_alone_keeps_the_watchdog_healthy() {
    let db = setup().await;
    add_agent(&db, AgentStatus::Error, 120).await;
    let issues = IssueLog::new(10);
    let status = WatchdogStatus::new();

    let agents = watchdog(&db);
    run_check(&agents, &issues, &status).await;

    let health = status.get(agents.name()).unwrap();
    assert_eq!(health.issues_found, 1);
    assert!(health.healthy);
    assert_eq!(issues.recent(1)[0].severity, Severity::Info);
}

#[tokio::test]
async fn slow_backend_is_reported() {
    let db = setup().await;
    let backend = BackendWatchdog::new(db, StdDuration::from_secs(30))
        .with_slow_threshold(StdDuration::ZERO);

    let issues = backend.check().await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Warning);
}

#[tokio::test]
async fn spawned_watchdog_checks_then_stops_on_notify() {
    let db = setup().await;
    let issues = IssueLog::new(10);
    let status = WatchdogStatus::new();
    let notify = Arc::new(Notify::new());

    let handle = spawn_watchdog(
        Arc::new(BackendWatchdog::new(db, StdDuration::from_secs(1))),
        issues,
        status.clone(),
        notify.clone(),
    );

    tokio::time::sleep(StdDuration::from_millis(200)).await;
    assert!(status.get("backend").is_some());

    notify.notify_waiters();
    tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("watchdog did not stop")
        .unwrap();
}
