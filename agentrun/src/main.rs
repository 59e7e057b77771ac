mod config;

use std::{sync::Arc, time::Duration};

use agentrun_database::{
    initialize_database, interfaces::DatabaseImpl, postgres::PostgresDb, sqlite::SqliteDb,
};
use agentrun_executor::Executor;
use agentrun_llm::OpenAiCompatibleClient;
use agentrun_models::errors::{RuntimeError, SendableError};
use agentrun_scheduler::scheduler_loop;
use agentrun_utilities::startup;
use agentrun_watchdog::{
    Watchdog, agents::AgentWatchdog, backend::BackendWatchdog, issues::IssueLog, spawn_watchdog,
    status::WatchdogStatus,
};
use agentrun_ws::{AppState, run_webserver};
use clap::Parser;
use log::{error, info, warn};
use tokio::sync::Notify;

use crate::config::{CliArgs, DatabaseKind};

#[tokio::main]
async fn main() -> Result<(), SendableError> {
    let args = CliArgs::parse();
    startup("Agentrun", &args.log_settings())?;

    let notify = Arc::new(Notify::new());
    let shutdown_listener = notify.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", err);
            return;
        }
        info!("Received shutdown signal. Shutting down...");
        shutdown_listener.notify_waiters();
    });

    match args.database {
        DatabaseKind::Sqlite => {
            info!("Using SQLite database at {}", args.sqlite_path);
            let db = Arc::new(SqliteDb::new(&args.sqlite_path).await?);
            run(db, &args, notify).await?;
        }
        DatabaseKind::Postgres => {
            let url = args.database_url.as_deref().ok_or_else(|| {
                RuntimeError::new(
                    "config".to_string(),
                    "--database-url must be provided when --database=postgres".to_string(),
                )
            })?;
            info!("Using Postgres database");
            let db = Arc::new(PostgresDb::new(url).await?);
            run(db, &args, notify).await?;
        }
    }

    info!("Application shutdown complete.");
    Ok(())
}

async fn run<D: DatabaseImpl>(
    db: Arc<D>,
    args: &CliArgs,
    notify: Arc<Notify>,
) -> Result<(), SendableError> {
    initialize_database(&db, &args.init_scripts).await?;

    if args.llm_api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
        warn!("No LLM API key configured, content and social agents will fail");
    }
    let llm = Arc::new(OpenAiCompatibleClient::new(
        &args.llm_base_url,
        args.llm_api_key.clone(),
        args.llm_model.clone(),
        args.llm_timeout(),
    )?);
    let executor = Arc::new(Executor::new(db.clone(), llm, args.executor_settings()));

    info!("Initialize scheduler");
    let scheduler_config = args.scheduler_config();
    let scheduler_executor = executor.clone();
    let scheduler_notify = notify.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler_loop(scheduler_executor, scheduler_notify, &scheduler_config).await;
    });

    info!("Initialize watchdogs");
    let issues = IssueLog::new(args.issue_log_capacity);
    let watchdog_status = WatchdogStatus::new();
    let watchdogs: Vec<Arc<dyn Watchdog>> = vec![
        Arc::new(BackendWatchdog::new(
            db.clone(),
            Duration::from_secs(args.backend_watchdog_seconds),
        )),
        Arc::new(AgentWatchdog::new(db.clone(), args.agent_watchdog_settings())),
    ];
    let watchdog_tasks: Vec<_> = watchdogs
        .into_iter()
        .map(|watchdog| {
            spawn_watchdog(watchdog, issues.clone(), watchdog_status.clone(), notify.clone())
        })
        .collect();

    info!("Initialize web server");
    let state = Arc::new(AppState {
        executor,
        issues,
        watchdogs: watchdog_status,
    });
    info!("Initialization complete!");
    let served = run_webserver(state, notify.clone(), args.port).await;
    if served.is_err() {
        // Stop the background tasks too when the server could not start.
        notify.notify_waiters();
    }

    if let Err(err) = scheduler_task.await {
        error!("Scheduler task ended abnormally: {:?}", err);
    }
    for task in watchdog_tasks {
        if let Err(err) = task.await {
            error!("Watchdog task ended abnormally: {:?}", err);
        }
    }
    served
}
