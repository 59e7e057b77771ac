use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub watchdog: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
    pub detected_at: DateTime<Utc>,
}

impl Issue {
    pub fn new(watchdog: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            watchdog: watchdog.to_string(),
            severity,
            message: message.into(),
            agent_id: None,
            detected_at: Utc::now(),
        }
    }

    pub fn for_agent(mut self, agent_id: i64) -> Self {
        self.agent_id = Some(agent_id);
        self
    }
}

/// Shared, bounded diagnostic log. Once full, the oldest entries are dropped.
#[derive(Clone)]
pub struct IssueLog {
    entries: Arc<Mutex<VecDeque<Issue>>>,
    capacity: usize,
}

impl IssueLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn record(&self, issue: Issue) {
        let mut entries = self.entries.lock();
        entries.push_back(issue);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<Issue> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
