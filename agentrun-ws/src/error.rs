use agentrun_executor::{ExecutorError, schedule::ScheduleError};
use agentrun_models::{errors::SendableError, web::ErrorResponse};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("agent {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("{0}")]
    Internal(String),
}

impl From<SendableError> for ApiError {
    fn from(err: SendableError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Schedule(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::Executor(ExecutorError::AgentNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Executor(ExecutorError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            ApiError::Executor(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
