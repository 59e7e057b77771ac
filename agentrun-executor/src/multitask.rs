use agentrun_models::core::AgentType;
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub task: String,
    pub batch: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MultitaskReport {
    pub batches: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub tasks: Vec<TaskOutcome>,
}

pub fn default_tasks(agent_type: AgentType) -> Vec<String> {
    let tasks: &[&str] = match agent_type {
        AgentType::ContentGenerator => &[
            "draft blog outline",
            "write product description",
            "write meta description",
            "suggest image captions",
        ],
        AgentType::SocialMediaManager => &[
            "draft instagram post",
            "draft tiktok caption",
            "pick trending hashtags",
        ],
        AgentType::InventoryMonitor => &[
            "scan low stock",
            "flag out of stock",
            "estimate restock dates",
        ],
        AgentType::PriceOptimizer => &[
            "collect competitor prices",
            "compute margin floor",
            "propose price changes",
        ],
        AgentType::EmailCampaign => &[
            "segment audience",
            "draft subject lines",
            "schedule send batches",
        ],
        AgentType::SeoOptimizer => &[
            "audit page titles",
            "score keywords",
            "check broken links",
            "propose internal links",
            "review meta tags",
        ],
    };
    tasks.iter().map(|task| task.to_string()).collect()
}

async fn run_task(agent_type: AgentType, task: String, batch: usize) -> TaskOutcome {
    if task.trim().is_empty() {
        return TaskOutcome {
            task,
            batch,
            success: false,
            output: None,
            error: Some("task description is empty".into()),
        };
    }

    let output = json!({
        "summary": format!("{agent_type} completed '{task}'"),
        "status": "done",
    });
    TaskOutcome {
        task,
        batch,
        success: true,
        output: Some(output),
        error: None,
    }
}

/// Runs `tasks` in consecutive batches of at most `max_parallel`, each batch
/// awaited as a whole before the next starts. Failed tasks are collected, not
/// propagated.
pub async fn run_batched(agent_type: AgentType, tasks: Vec<String>, max_parallel: usize) -> MultitaskReport {
    let max_parallel = max_parallel.max(1);
    let total = tasks.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut batches = 0;

    for chunk in tasks.chunks(max_parallel) {
        let batch = batches;
        batches += 1;
        let settled = join_all(
            chunk
                .iter()
                .cloned()
                .map(|task| run_task(agent_type, task, batch)),
        )
        .await;
        outcomes.extend(settled);
    }

    let succeeded = outcomes.iter().filter(|outcome| outcome.success).count();
    MultitaskReport {
        batches,
        total,
        succeeded,
        failed: total - succeeded,
        tasks: outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("task {i}")).collect()
    }

    #[tokio::test]
    async fn batch_count_is_ceiling_of_tasks_over_parallelism() {
        for (count, parallel, expected) in [(7, 3, 3), (6, 3, 2), (1, 4, 1), (5, 1, 5), (0, 2, 0)] {
            let report = run_batched(AgentType::SeoOptimizer, tasks(count), parallel).await;
            assert_eq!(report.batches, expected, "{count} tasks / {parallel}");
            assert_eq!(report.total, count);
        }
    }

    #[tokio::test]
    async fn zero_parallelism_runs_one_at_a_time() {
        let report = run_batched(AgentType::EmailCampaign, tasks(3), 0).await;
        assert_eq!(report.batches, 3);
    }

    #[tokio::test]
    async fn failed_task_does_not_stop_its_batch() {
        let report = run_batched(
            AgentType::ContentGenerator,
            vec!["write hero copy".into(), "  ".into(), "write footer".into()],
            2,
        )
        .await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.tasks[1].error.as_deref(), Some("task description is empty"));
        assert_eq!(report.tasks[2].batch, 1);
    }

    #[test]
    fn every_type_has_default_tasks() {
        for agent_type in AgentType::ALL {
            assert!(!default_tasks(agent_type).is_empty());
        }
    }
}
