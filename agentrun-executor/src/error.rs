use agentrun_llm::LlmError;
use agentrun_models::errors::SendableError;
use thiserror::Error;

use crate::schedule::ScheduleError;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("agent {0} not found")]
    AgentNotFound(i64),

    #[error("agent {0} is already running")]
    AlreadyRunning(i64),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("database error: {0}")]
    Database(#[from] SendableError),
}
