//! The two executor functions the dashboard calls.

use std::sync::Arc;

use agentrun_database::interfaces::DatabaseImpl;
use agentrun_executor::{ExecutionMode, ExecutionOutcome};
use agentrun_models::web::{
    EnhancedExecutorRequest, ExecutionResponse, ExecutorRequest, ScheduleCheckResponse,
};
use agentrun_scheduler::schedule_check;
use axum::{
    Extension, Json,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use log::info;

use crate::{AppState, error::ApiError, extract::ApiJson};

fn execution_response(outcome: ExecutionOutcome) -> ExecutionResponse {
    ExecutionResponse {
        success: true,
        execution_id: outcome.execution_id,
        agent_id: outcome.agent_id,
        result: outcome.result,
        duration_ms: outcome.duration_ms,
    }
}

pub(crate) async fn ai_agent_executor<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
    ApiJson(request): ApiJson<ExecutorRequest>,
) -> Result<Response, ApiError> {
    info!("ai-agent-executor action '{}'", request.action);
    match request.action.as_str() {
        "execute" => {
            let agent_id = request
                .agent_id
                .ok_or_else(|| ApiError::BadRequest("agentId is required to execute".to_string()))?;
            let outcome = state
                .executor
                .execute(agent_id, ExecutionMode::Standard)
                .await?;
            Ok(Json(execution_response(outcome)).into_response())
        }
        "schedule_check" => {
            let report = schedule_check(&state.executor, Utc::now()).await?;
            Ok(Json(ScheduleCheckResponse::from(report)).into_response())
        }
        other => Err(ApiError::BadRequest(format!("Unknown action '{other}'"))),
    }
}

pub(crate) async fn enhanced_ai_executor<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
    ApiJson(request): ApiJson<EnhancedExecutorRequest>,
) -> Result<Json<ExecutionResponse>, ApiError> {
    info!(
        "enhanced-ai-executor action '{}' for agent {}",
        request.action, request.agent_id
    );
    let mode = match request.action.as_str() {
        "execute" => ExecutionMode::Standard,
        "deep_think" => ExecutionMode::DeepThink,
        "multitask" => ExecutionMode::Multitask {
            tasks: request.tasks,
        },
        other => return Err(ApiError::BadRequest(format!("Unknown action '{other}'"))),
    };

    let outcome = state.executor.execute(request.agent_id, mode).await?;
    Ok(Json(execution_response(outcome)))
}
