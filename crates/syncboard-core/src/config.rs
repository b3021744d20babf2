// ── Workspace configuration ──

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime settings for a [`Workspace`](crate::Workspace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between background reloads of every kind. `0` disables
    /// the refresh task.
    pub refresh_interval_secs: u64,
    /// Load every kind during `start()`.
    pub load_on_start: bool,
}

impl SyncConfig {
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 0,
            load_on_start: true,
        }
    }
}
