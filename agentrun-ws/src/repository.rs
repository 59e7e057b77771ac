use agentrun_database::interfaces::DatabaseImpl;
use agentrun_executor::schedule::next_run_after;
use agentrun_models::{
    core::{Agent, AgentStatus, ExecutionLog},
    web::{AgentResponse, AgentUpdateRequest},
};
use chrono::Utc;

use crate::error::ApiError;

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 500;

async fn require_agent<T: DatabaseImpl>(db: &T, agent_id: i64) -> Result<Agent, ApiError> {
    db.fetch_agent(agent_id)
        .await?
        .ok_or(ApiError::NotFound(agent_id))
}

pub async fn add_agent<T: DatabaseImpl>(db: &T, agent: &Agent) -> Result<AgentResponse, ApiError> {
    let now = Utc::now();
    // Rejects a bad schedule up front instead of on the first run.
    let next_run_at = next_run_after(&agent.schedule, now)?;

    let agent = Agent {
        id: None,
        next_run_at: agent.next_run_at.or(Some(next_run_at)),
        created_at: now,
        updated_at: now,
        ..agent.clone()
    };
    let agent_id = db.insert_agent(&agent).await?;
    Ok(AgentResponse {
        success: true,
        message: "Agent added successfully".to_string(),
        agent_id: Some(agent_id),
    })
}

pub async fn update_agent<T: DatabaseImpl>(
    db: &T,
    agent_id: i64,
    changes: AgentUpdateRequest,
) -> Result<Agent, ApiError> {
    let mut agent = require_agent(db, agent_id).await?;
    let now = Utc::now();

    let reactivated =
        changes.status == Some(AgentStatus::Active) && agent.status != AgentStatus::Active;
    let reschedule = changes.schedule.is_some() || reactivated;
    if let Some(name) = changes.name {
        agent.name = name;
    }
    if let Some(config) = changes.config {
        agent.config = config;
    }
    if let Some(schedule) = changes.schedule {
        agent.schedule = schedule;
    }
    if let Some(status) = changes.status {
        agent.status = status;
    }
    if reschedule {
        agent.next_run_at = Some(next_run_after(&agent.schedule, now)?);
    }
    agent.updated_at = now;

    db.update_agent(&agent).await?;
    Ok(agent)
}

/// User toggle. Moving to `active` starts the schedule over from now.
pub async fn set_agent_status<T: DatabaseImpl>(
    db: &T,
    agent_id: i64,
    status: AgentStatus,
) -> Result<AgentResponse, ApiError> {
    let mut agent = require_agent(db, agent_id).await?;
    let now = Utc::now();
    if status == AgentStatus::Active {
        agent.next_run_at = Some(next_run_after(&agent.schedule, now)?);
    }
    agent.status = status;
    agent.updated_at = now;
    db.update_agent(&agent).await?;

    Ok(AgentResponse {
        success: true,
        message: format!("Agent {} is now {}", agent_id, status),
        agent_id: Some(agent_id),
    })
}

pub async fn fetch_agents<T: DatabaseImpl>(db: &T) -> Result<Vec<Agent>, ApiError> {
    Ok(db.fetch_all_agents().await?)
}

pub async fn fetch_agent<T: DatabaseImpl>(db: &T, agent_id: i64) -> Result<Agent, ApiError> {
    require_agent(db, agent_id).await
}

pub async fn fetch_agent_logs<T: DatabaseImpl>(
    db: &T,
    agent_id: i64,
    limit: Option<i64>,
) -> Result<Vec<ExecutionLog>, ApiError> {
    require_agent(db, agent_id).await?;
    let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    Ok(db.fetch_execution_logs(agent_id, limit).await?)
}

pub async fn fetch_execution_logs<T: DatabaseImpl>(
    db: &T,
    start: i64,
    end: i64,
) -> Result<Vec<ExecutionLog>, ApiError> {
    Ok(db.fetch_execution_logs_between(start, end).await?)
}
