//! Supervised worker domain types

use serde::{Deserialize, Serialize};

/// Health of the supervised worker as last observed by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerHealth {
    Starting,
    Healthy,
    Unreachable,
}

/// Snapshot of the supervised worker process
///
/// Written only by the supervisor; everyone else reads copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub pid: Option<u32>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub health: WorkerHealth,
}

impl WorkerStatus {
    pub fn starting() -> Self {
        Self {
            pid: None,
            started_at: None,
            health: WorkerHealth::Starting,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health == WorkerHealth::Healthy
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::starting()
    }
}
