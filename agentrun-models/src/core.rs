use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RuntimeError;

/// The closed set of marketing-automation behaviors an agent can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    ContentGenerator,
    SocialMediaManager,
    InventoryMonitor,
    PriceOptimizer,
    EmailCampaign,
    SeoOptimizer,
}

impl AgentType {
    pub const ALL: [AgentType; 6] = [
        AgentType::ContentGenerator,
        AgentType::SocialMediaManager,
        AgentType::InventoryMonitor,
        AgentType::PriceOptimizer,
        AgentType::EmailCampaign,
        AgentType::SeoOptimizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::ContentGenerator => "content_generator",
            AgentType::SocialMediaManager => "social_media_manager",
            AgentType::InventoryMonitor => "inventory_monitor",
            AgentType::PriceOptimizer => "price_optimizer",
            AgentType::EmailCampaign => "email_campaign",
            AgentType::SeoOptimizer => "seo_optimizer",
        }
    }

    /// Types whose handler makes a real chat-completion call.
    pub fn uses_llm(&self) -> bool {
        matches!(
            self,
            AgentType::ContentGenerator | AgentType::SocialMediaManager
        )
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = RuntimeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                RuntimeError::new(
                    "models.agent_type.unknown".into(),
                    format!("Unknown agent type '{value}'"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Paused,
    Stopped,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Paused => "paused",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Error => "error",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = RuntimeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(AgentStatus::Active),
            "paused" => Ok(AgentStatus::Paused),
            "stopped" => Ok(AgentStatus::Stopped),
            "error" => Ok(AgentStatus::Error),
            other => Err(RuntimeError::new(
                "models.agent_status.unknown".into(),
                format!("Unknown agent status '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    #[serde(default = "empty_config")]
    pub config: Value,
    pub schedule: String,
    #[serde(default = "default_status")]
    pub status: AgentStatus,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: impl Into<String>, agent_type: AgentType, schedule: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            agent_type,
            config: empty_config(),
            schedule: schedule.into(),
            status: AgentStatus::Active,
            last_run_at: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn settings(&self) -> AgentSettings {
        AgentSettings::from_config(&self.config)
    }
}

fn empty_config() -> Value {
    Value::Object(Default::default())
}

fn default_status() -> AgentStatus {
    AgentStatus::Active
}

const DEFAULT_THINKING_DEPTH: u32 = 3;
pub const MAX_THINKING_DEPTH: u32 = 10;
const DEFAULT_PARALLEL_TASKS: usize = 3;

/// Typed view over the execution switches stored in an agent's free-form config.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub enable_deep_thinking: bool,
    pub max_thinking_depth: u32,
    pub enable_multitasking: bool,
    pub max_parallel_tasks: usize,
    pub model: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            enable_deep_thinking: false,
            max_thinking_depth: DEFAULT_THINKING_DEPTH,
            enable_multitasking: false,
            max_parallel_tasks: DEFAULT_PARALLEL_TASKS,
            model: None,
        }
    }
}

impl AgentSettings {
    /// Reads each recognised key on its own and ignores everything else. A
    /// missing or mistyped key falls back to its default without touching
    /// the others.
    pub fn from_config(config: &Value) -> Self {
        let defaults = AgentSettings::default();
        let depth = config
            .get("max_thinking_depth")
            .and_then(Value::as_u64)
            .map(|depth| depth.min(MAX_THINKING_DEPTH as u64) as u32)
            .unwrap_or(defaults.max_thinking_depth);
        let parallel = config
            .get("max_parallel_tasks")
            .and_then(Value::as_u64)
            .map(|tasks| usize::try_from(tasks).unwrap_or(usize::MAX))
            .unwrap_or(defaults.max_parallel_tasks);

        AgentSettings {
            enable_deep_thinking: config
                .get("enable_deep_thinking")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.enable_deep_thinking),
            max_thinking_depth: depth.clamp(1, MAX_THINKING_DEPTH),
            enable_multitasking: config
                .get("enable_multitasking")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.enable_multitasking),
            max_parallel_tasks: parallel.max(1),
            model: config
                .get("model")
                .and_then(Value::as_str)
                .filter(|model| !model.trim().is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Started,
    Completed,
    Failed,
    Reset,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Started => "started",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Reset => "reset",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = RuntimeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "started" => Ok(ExecutionStatus::Started),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            "reset" => Ok(ExecutionStatus::Reset),
            other => Err(RuntimeError::new(
                "models.execution_status.unknown".into(),
                format!("Unknown execution status '{other}'"),
            )),
        }
    }
}

/// Append-only record of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: Option<i64>,
    pub agent_id: i64,
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub result: Value,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl ExecutionLog {
    pub fn new(
        agent_id: i64,
        execution_id: impl Into<String>,
        status: ExecutionStatus,
        result: Value,
        duration_ms: i64,
    ) -> Self {
        Self {
            id: None,
            agent_id,
            execution_id: execution_id.into(),
            status,
            result,
            duration_ms,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLock {
    pub agent_id: i64,
    pub execution_id: String,
    pub expires_at: DateTime<Utc>,
}
