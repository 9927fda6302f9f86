//! Per-user module progress.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ProgressStatus::InProgress),
            "completed" => Ok(ProgressStatus::Completed),
            other => Err(format!(
                "invalid status {other:?}, must be: in_progress or completed"
            )),
        }
    }
}

/// Unique per `(user_id, module_id)`; a second start is a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserModuleProgress {
    pub id: String,
    pub user_id: String,
    pub module_id: String,
    pub status: ProgressStatus,
    pub current_section_index: u32,
    pub started_at: DateTime<Utc>,
    /// Set only once the status becomes `Completed`.
    pub completed_at: Option<DateTime<Utc>>,
}
