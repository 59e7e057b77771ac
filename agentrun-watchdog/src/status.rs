use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct WatchdogHealth {
    pub healthy: bool,
    pub last_check: DateTime<Utc>,
    pub issues_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Latest result per watchdog, keyed by name.
#[derive(Clone, Default)]
pub struct WatchdogStatus {
    inner: Arc<RwLock<BTreeMap<String, WatchdogHealth>>>,
}

impl WatchdogStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, name: &str, health: WatchdogHealth) {
        self.inner.write().insert(name.to_string(), health);
    }

    pub fn get(&self, name: &str) -> Option<WatchdogHealth> {
        self.inner.read().get(name).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, WatchdogHealth> {
        self.inner.read().clone()
    }

    /// True until some watchdog has reported a failing check.
    pub fn all_healthy(&self) -> bool {
        self.inner.read().values().all(|health| health.healthy)
    }
}
