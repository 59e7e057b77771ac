use std::{path::PathBuf, time::Duration};

use agentrun_executor::ExecutorSettings;
use agentrun_models::core::MAX_THINKING_DEPTH;
use agentrun_scheduler::config::SchedulerConfig;
use agentrun_utilities::LogSettings;
use agentrun_watchdog::agents::AgentWatchdogSettings;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Clone, Debug, PartialEq, ValueEnum)]
pub(crate) enum DatabaseKind {
    Sqlite,
    Postgres,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct CliArgs {
    /// Webservice port to bind to
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Database backend to use
    #[arg(long, value_enum, default_value_t = DatabaseKind::Sqlite)]
    pub database: DatabaseKind,

    /// Path to the SQLite database file (used when --database=sqlite)
    #[arg(long, default_value = "agentrun.db")]
    pub sqlite_path: String,

    /// Connection string for the database (required when --database=postgres)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Extra SQL scripts run after the built-in schema
    #[arg(long, value_delimiter = ',')]
    pub init_scripts: Vec<String>,

    /// Seconds between scheduler polls for due agents
    #[arg(long, default_value_t = 60)]
    pub scheduler_frequency_seconds: u64,

    /// Base URL of the OpenAI-compatible chat-completion API
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Model used when an agent does not configure one
    #[arg(long, default_value = "gpt-4o-mini")]
    pub llm_model: String,

    #[arg(long, default_value_t = 60)]
    pub llm_timeout_seconds: u64,

    /// How long an execution lock holds before another run may take it over.
    /// Raised to cover the slowest deep-thinking run at the configured LLM timeout.
    #[arg(long, default_value_t = 900)]
    pub lock_ttl_seconds: i64,

    #[arg(long, default_value_t = 30)]
    pub backend_watchdog_seconds: u64,

    #[arg(long, default_value_t = 45)]
    pub agent_watchdog_seconds: u64,

    /// Age of an unfinished run before the agent watchdog resets it
    #[arg(long, default_value_t = 1200)]
    pub stuck_after_seconds: i64,

    /// Age of an error status before the agent is re-activated, 0 disables
    #[arg(long, default_value_t = 3600)]
    pub error_reset_after_seconds: i64,

    /// How far past next_run_at an active agent is reported as overdue
    #[arg(long, default_value_t = 300)]
    pub overdue_after_seconds: i64,

    /// Number of watchdog issues kept for /health
    #[arg(long, default_value_t = 200)]
    pub issue_log_capacity: usize,

    #[arg(long, default_value = "agentrun.log")]
    pub log_file: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

impl CliArgs {
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            level: self.log_level,
            file: Some(self.log_file.clone()),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            scheduler_frequency_seconds: self.scheduler_frequency_seconds,
        }
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            lock_ttl: chrono::Duration::seconds(self.lock_ttl_seconds.max(self.slowest_run_seconds())),
        }
    }

    /// Every thinking step plus the synthesis call timing out, with a minute of slack.
    fn slowest_run_seconds(&self) -> i64 {
        let calls = u64::from(MAX_THINKING_DEPTH) + 1;
        let seconds = self.llm_timeout_seconds.max(1).saturating_mul(calls).saturating_add(60);
        i64::try_from(seconds).unwrap_or(i64::MAX)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_seconds.max(1))
    }

    pub fn agent_watchdog_settings(&self) -> AgentWatchdogSettings {
        AgentWatchdogSettings {
            interval: Duration::from_secs(self.agent_watchdog_seconds),
            stuck_after: chrono::Duration::seconds(self.stuck_after_seconds)
                .max(self.executor_settings().lock_ttl),
            error_reset_after: (self.error_reset_after_seconds > 0)
                .then(|| chrono::Duration::seconds(self.error_reset_after_seconds)),
            overdue_after: chrono::Duration::seconds(self.overdue_after_seconds),
        }
    }
}
