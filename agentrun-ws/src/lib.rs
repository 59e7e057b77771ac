mod error;
mod extract;
mod functions;
mod repository;

pub use error::ApiError;

use std::{collections::HashMap, sync::Arc};

use agentrun_database::interfaces::DatabaseImpl;
use agentrun_executor::Executor;
use agentrun_models::{
    core::{Agent, ExecutionLog},
    errors::SendableError,
    web::{AgentResponse, AgentUpdateRequest, StatusChangeRequest},
};
use agentrun_watchdog::{issues::IssueLog, status::WatchdogStatus};
use axum::{
    Extension, Json, Router,
    extract::Query,
    routing::{get, post},
};
use log::{debug, info};
use serde_json::{Value, json};
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;

use crate::extract::{ApiJson, ApiPath};

const HEALTH_ISSUE_LIMIT: usize = 20;

pub struct AppState<D: DatabaseImpl> {
    pub executor: Arc<Executor<D>>,
    pub issues: IssueLog,
    pub watchdogs: WatchdogStatus,
}

impl<D: DatabaseImpl> AppState<D> {
    fn db(&self) -> &D {
        self.executor.db().as_ref()
    }
}

async fn add_agent<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
    ApiJson(agent): ApiJson<Agent>,
) -> Result<Json<AgentResponse>, ApiError> {
    info!("Adding agent '{}' ({})", agent.name, agent.agent_type);
    Ok(Json(repository::add_agent(state.db(), &agent).await?))
}

async fn get_agents<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
) -> Result<Json<Vec<Agent>>, ApiError> {
    debug!("Fetching all agents");
    Ok(Json(repository::fetch_agents(state.db()).await?))
}

async fn get_agent<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
    ApiPath(agent_id): ApiPath<i64>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(repository::fetch_agent(state.db(), agent_id).await?))
}

async fn update_agent<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
    ApiPath(agent_id): ApiPath<i64>,
    ApiJson(changes): ApiJson<AgentUpdateRequest>,
) -> Result<Json<Agent>, ApiError> {
    info!("Updating agent {}: {:?}", agent_id, changes);
    Ok(Json(
        repository::update_agent(state.db(), agent_id, changes).await?,
    ))
}

async fn change_agent_status<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
    ApiPath(agent_id): ApiPath<i64>,
    ApiJson(request): ApiJson<StatusChangeRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    info!("Setting agent {} to {}", agent_id, request.status);
    Ok(Json(
        repository::set_agent_status(state.db(), agent_id, request.status).await?,
    ))
}

async fn get_agent_logs<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
    ApiPath(agent_id): ApiPath<i64>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ExecutionLog>>, ApiError> {
    let limit = params.get("limit").and_then(|v| v.parse::<i64>().ok());
    Ok(Json(
        repository::fetch_agent_logs(state.db(), agent_id, limit).await?,
    ))
}

async fn get_execution_logs<D: DatabaseImpl>(
    Extension(state): Extension<Arc<AppState<D>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ExecutionLog>>, ApiError> {
    let start_time = params
        .get("start_time")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);

    let end_time = params
        .get("end_time")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(i64::MAX);

    debug!("Fetching execution logs between {} and {}", start_time, end_time);
    Ok(Json(
        repository::fetch_execution_logs(state.db(), start_time, end_time).await?,
    ))
}

async fn health<D: DatabaseImpl>(Extension(state): Extension<Arc<AppState<D>>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "healthy": state.watchdogs.all_healthy(),
        "watchdogs": state.watchdogs.snapshot(),
        "issues": state.issues.recent(HEALTH_ISSUE_LIMIT),
    }))
}

pub fn build_router<D: DatabaseImpl>(state: Arc<AppState<D>>) -> Router {
    Router::new()
        .route(
            "/functions/v1/ai-agent-executor",
            post(functions::ai_agent_executor::<D>),
        )
        .route(
            "/functions/v1/enhanced-ai-executor",
            post(functions::enhanced_ai_executor::<D>),
        )
        .route("/agents", get(get_agents::<D>).post(add_agent::<D>))
        .route("/agents/{id}", get(get_agent::<D>).patch(update_agent::<D>))
        .route("/agents/{id}/status", post(change_agent_status::<D>))
        .route("/agents/{id}/logs", get(get_agent_logs::<D>))
        .route("/execution_logs", get(get_execution_logs::<D>))
        .route("/health", get(health::<D>))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
}

pub async fn run_webserver<D: DatabaseImpl>(
    state: Arc<AppState<D>>,
    notify: Arc<Notify>,
    port: u16,
) -> Result<(), SendableError> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Web server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            notify.notified().await;
            info!("Shutting down web server...");
        })
        .await?;
    Ok(())
}
