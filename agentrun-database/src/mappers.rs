use agentrun_models::{
    core::{Agent, ExecutionLog},
    errors::SendableError,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, postgres::PgRow, sqlite::SqliteRow};

struct AgentRecord {
    id: i64,
    name: String,
    agent_type: String,
    config: String,
    schedule: String,
    status: String,
    last_run_at: Option<i64>,
    next_run_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

struct LogRecord {
    id: i64,
    agent_id: i64,
    execution_id: String,
    status: String,
    result: String,
    duration_ms: i64,
    created_at: i64,
}

pub fn from_timestamp(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()
}

impl AgentRecord {
    fn into_agent(self) -> Result<Agent, SendableError> {
        Ok(Agent {
            id: Some(self.id),
            name: self.name,
            agent_type: self.agent_type.parse()?,
            config: serde_json::from_str(&self.config)?,
            schedule: self.schedule,
            status: self.status.parse()?,
            last_run_at: self.last_run_at.map(from_timestamp),
            next_run_at: self.next_run_at.map(from_timestamp),
            created_at: from_timestamp(self.created_at),
            updated_at: from_timestamp(self.updated_at),
        })
    }
}

impl LogRecord {
    fn into_log(self) -> Result<ExecutionLog, SendableError> {
        // A result column that isn't JSON is kept as a plain string.
        let result = serde_json::from_str(&self.result).unwrap_or(Value::String(self.result));
        Ok(ExecutionLog {
            id: Some(self.id),
            agent_id: self.agent_id,
            execution_id: self.execution_id,
            status: self.status.parse()?,
            result,
            duration_ms: self.duration_ms,
            created_at: from_timestamp(self.created_at),
        })
    }
}

pub fn sqlite_row_to_agent(row: &SqliteRow) -> Result<Agent, SendableError> {
    AgentRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        agent_type: row.try_get("agent_type")?,
        config: row.try_get("config")?,
        schedule: row.try_get("schedule")?,
        status: row.try_get("status")?,
        last_run_at: row.try_get("last_run_at")?,
        next_run_at: row.try_get("next_run_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    }
    .into_agent()
}

pub fn postgres_row_to_agent(row: &PgRow) -> Result<Agent, SendableError> {
    AgentRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        agent_type: row.try_get("agent_type")?,
        config: row.try_get("config")?,
        schedule: row.try_get("schedule")?,
        status: row.try_get("status")?,
        last_run_at: row.try_get("last_run_at")?,
        next_run_at: row.try_get("next_run_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    }
    .into_agent()
}

pub fn sqlite_row_to_log(row: &SqliteRow) -> Result<ExecutionLog, SendableError> {
    LogRecord {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        execution_id: row.try_get("execution_id")?,
        status: row.try_get("status")?,
        result: row.try_get("result")?,
        duration_ms: row.try_get("duration_ms")?,
        created_at: row.try_get("created_at")?,
    }
    .into_log()
}

pub fn postgres_row_to_log(row: &PgRow) -> Result<ExecutionLog, SendableError> {
    LogRecord {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        execution_id: row.try_get("execution_id")?,
        status: row.try_get("status")?,
        result: row.try_get("result")?,
        duration_ms: row.try_get("duration_ms")?,
        created_at: row.try_get("created_at")?,
    }
    .into_log()
}
