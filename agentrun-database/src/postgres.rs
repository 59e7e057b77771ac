use std::{fs, path::PathBuf, str::FromStr, time::Duration};

use agentrun_models::{
    core::{Agent, AgentStatus, ExecutionLock, ExecutionLog},
    errors::SendableError,
};
use chrono::{DateTime, Utc};
use futures_util::stream::StreamExt;
use log::{debug, info};
use sqlx::{
    ConnectOptions, Executor, PgPool, Row,
    postgres::{PgConnectOptions, PgPoolOptions},
};

use crate::{interfaces::DatabaseImpl, mappers};

const POSTGRES_TABLE_INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS ai_agents (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    agent_type TEXT NOT NULL,
    config TEXT NOT NULL,
    schedule TEXT NOT NULL,
    status TEXT NOT NULL,
    last_run_at BIGINT NULL,
    next_run_at BIGINT NULL,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ai_agents_due ON ai_agents (status, next_run_at);

CREATE TABLE IF NOT EXISTS agent_execution_logs (
    id BIGSERIAL PRIMARY KEY,
    agent_id BIGINT NOT NULL REFERENCES ai_agents(id),
    execution_id TEXT NOT NULL,
    status TEXT NOT NULL,
    result TEXT NOT NULL,
    duration_ms BIGINT NOT NULL,
    created_at BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_agent_execution_logs_agent ON agent_execution_logs (agent_id, id);

CREATE TABLE IF NOT EXISTS agent_execution_locks (
    agent_id BIGINT PRIMARY KEY REFERENCES ai_agents(id),
    execution_id TEXT NOT NULL,
    expires_at BIGINT NOT NULL
);
"#;

const AGENT_COLUMNS: &str = "id, name, agent_type, config, schedule, status, last_run_at, next_run_at, created_at, updated_at";
const LOG_COLUMNS: &str = "id, agent_id, execution_id, status, result, duration_ms, created_at";

pub struct PostgresDb {
    pub pool: PgPool,
}

impl PostgresDb {
    pub async fn new(connection_str: &str) -> Result<Self, SendableError> {
        let mut options = PgConnectOptions::from_str(connection_str)?;
        options
            .log_statements(log::LevelFilter::Debug)
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(1));

        let pool = PgPoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    async fn execute_script(&self, script: &str) -> Result<(), SendableError> {
        let sql = script.trim();
        if sql.is_empty() {
            return Ok(());
        }

        for statement in sql.split(';') {
            let stmt = statement.trim();
            if stmt.is_empty() {
                continue;
            }

            let mut stream = self.pool.execute_many(sqlx::query(stmt));
            while let Some(result) = stream.next().await {
                let query_result = result?;
                debug!(
                    "Init scripts: {} row(s) affected",
                    query_result.rows_affected()
                );
            }
        }

        Ok(())
    }
}

impl DatabaseImpl for PostgresDb {
    async fn run_init_scripts(&self, paths: &[String]) -> Result<(), SendableError> {
        info!("Running embedded Postgres table initialization script");
        self.execute_script(POSTGRES_TABLE_INIT_SQL).await?;
        for path in paths {
            let path_info = PathBuf::from(path);
            if path_info.extension().and_then(|ext| ext.to_str()) == Some("sql") {
                info!("Running {}", path_info.display());
                let script = fs::read_to_string(&path_info)?;
                self.execute_script(&script).await?;
            }
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), SendableError> {
        self.pool.execute(sqlx::query("SELECT 1")).await?;
        Ok(())
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<i64, SendableError> {
        let row = sqlx::query(
            "INSERT INTO ai_agents (
                name,
                agent_type,
                config,
                schedule,
                status,
                last_run_at,
                next_run_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id",
        )
        .bind(&agent.name)
        .bind(agent.agent_type.as_str())
        .bind(agent.config.to_string())
        .bind(&agent.schedule)
        .bind(agent.status.as_str())
        .bind(agent.last_run_at.map(|dt| dt.timestamp()))
        .bind(agent.next_run_at.map(|dt| dt.timestamp()))
        .bind(agent.created_at.timestamp())
        .bind(agent.updated_at.timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    async fn update_agent(&self, agent: &Agent) -> Result<(), SendableError> {
        self.pool
            .execute(
                sqlx::query(
                    "UPDATE ai_agents SET
                        name = $1,
                        agent_type = $2,
                        config = $3,
                        schedule = $4,
                        status = $5,
                        last_run_at = $6,
                        next_run_at = $7,
                        updated_at = $8
                     WHERE id = $9",
                )
                .bind(&agent.name)
                .bind(agent.agent_type.as_str())
                .bind(agent.config.to_string())
                .bind(&agent.schedule)
                .bind(agent.status.as_str())
                .bind(agent.last_run_at.map(|dt| dt.timestamp()))
                .bind(agent.next_run_at.map(|dt| dt.timestamp()))
                .bind(agent.updated_at.timestamp())
                .bind(agent.id),
            )
            .await?;
        Ok(())
    }

    async fn fetch_agent(&self, agent_id: i64) -> Result<Option<Agent>, SendableError> {
        let row = sqlx::query(&format!("SELECT {AGENT_COLUMNS} FROM ai_agents WHERE id = $1"))
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(mappers::postgres_row_to_agent).transpose()
    }

    async fn fetch_all_agents(&self) -> Result<Vec<Agent>, SendableError> {
        let rows = sqlx::query(&format!("SELECT {AGENT_COLUMNS} FROM ai_agents ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(mappers::postgres_row_to_agent).collect()
    }

    async fn fetch_due_agents(&self, now: DateTime<Utc>) -> Result<Vec<Agent>, SendableError> {
        let rows = sqlx::query(&format!(
            "SELECT {AGENT_COLUMNS} FROM ai_agents
             WHERE status = 'active' AND next_run_at IS NOT NULL AND next_run_at <= $1
             ORDER BY next_run_at, id"
        ))
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(mappers::postgres_row_to_agent).collect()
    }

    async fn update_agent_status(
        &self,
        agent_id: i64,
        status: AgentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        self.pool
            .execute(
                sqlx::query("UPDATE ai_agents SET status = $1, updated_at = $2 WHERE id = $3")
                    .bind(status.as_str())
                    .bind(now.timestamp())
                    .bind(agent_id),
            )
            .await?;
        Ok(())
    }

    async fn update_agent_schedule(
        &self,
        agent_id: i64,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        self.pool
            .execute(
                sqlx::query(
                    "UPDATE ai_agents
                     SET last_run_at = $1, next_run_at = $2, updated_at = $3,
                         status = CASE WHEN status = 'error' THEN 'active' ELSE status END
                     WHERE id = $4",
                )
                .bind(last_run_at.timestamp())
                .bind(next_run_at.map(|dt| dt.timestamp()))
                .bind(now.timestamp())
                .bind(agent_id),
            )
            .await?;
        Ok(())
    }

    async fn insert_execution_log(&self, log: &ExecutionLog) -> Result<i64, SendableError> {
        let row = sqlx::query(
            "INSERT INTO agent_execution_logs (agent_id, execution_id, status, result, duration_ms, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(log.agent_id)
        .bind(&log.execution_id)
        .bind(log.status.as_str())
        .bind(log.result.to_string())
        .bind(log.duration_ms)
        .bind(log.created_at.timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    async fn fetch_execution_logs(
        &self,
        agent_id: i64,
        limit: i64,
    ) -> Result<Vec<ExecutionLog>, SendableError> {
        let rows = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM agent_execution_logs WHERE agent_id = $1 ORDER BY id DESC LIMIT $2"
        ))
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(mappers::postgres_row_to_log).collect()
    }

    async fn fetch_execution_logs_between(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<ExecutionLog>, SendableError> {
        let rows = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM agent_execution_logs
             WHERE created_at >= $1 AND created_at <= $2
             ORDER BY id"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(mappers::postgres_row_to_log).collect()
    }

    async fn fetch_latest_execution_log(
        &self,
        agent_id: i64,
    ) -> Result<Option<ExecutionLog>, SendableError> {
        let row = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM agent_execution_logs WHERE agent_id = $1 ORDER BY id DESC LIMIT 1"
        ))
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(mappers::postgres_row_to_log).transpose()
    }

    async fn try_acquire_lock(
        &self,
        lock: &ExecutionLock,
        now: DateTime<Utc>,
    ) -> Result<bool, SendableError> {
        let result = self
            .pool
            .execute(
                sqlx::query(
                    "INSERT INTO agent_execution_locks (agent_id, execution_id, expires_at)
                     VALUES ($1, $2, $3)
                     ON CONFLICT (agent_id) DO UPDATE SET
                        execution_id = EXCLUDED.execution_id,
                        expires_at = EXCLUDED.expires_at
                     WHERE agent_execution_locks.expires_at <= $4",
                )
                .bind(lock.agent_id)
                .bind(&lock.execution_id)
                .bind(lock.expires_at.timestamp())
                .bind(now.timestamp()),
            )
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_lock(&self, agent_id: i64, execution_id: &str) -> Result<(), SendableError> {
        self.pool
            .execute(
                sqlx::query(
                    "DELETE FROM agent_execution_locks WHERE agent_id = $1 AND execution_id = $2",
                )
                .bind(agent_id)
                .bind(execution_id),
            )
            .await?;
        Ok(())
    }

    async fn force_release_lock(&self, agent_id: i64) -> Result<(), SendableError> {
        self.pool
            .execute(sqlx::query("DELETE FROM agent_execution_locks WHERE agent_id = $1").bind(agent_id))
            .await?;
        Ok(())
    }
}
