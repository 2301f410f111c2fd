//! Status record of an autofix run.
//!
//! The record is persisted as JSON under [`AUTOFIX_METADATA_KEY`] in the group's
//! metadata. On the wire it is a flat object whose `status` field selects which
//! other fields are present:
//!
//! ```json
//! {"status": "PROCESSING", "created_at": "...", "steps": [...]}
//! {"status": "ERROR", "created_at": "...", "completed_at": "...", "steps": [], "fix": null, "error_message": "..."}
//! {"status": "COMPLETED", "created_at": "...", "completed_at": "...", "steps": [...], "fix": {...}}
//! ```
//!
//! Runs move from `PROCESSING` to either terminal state. Nothing here enforces
//! that; writers are expected not to resurrect a finished run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const AUTOFIX_METADATA_KEY: &str = "autofix";

pub const PLACEHOLDER_STEP_TITLE: &str = "Waiting to be picked up...";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutofixStatus {
    Processing,
    Error,
    Completed,
}

impl AutofixStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AutofixStatus::Processing => "PROCESSING",
            AutofixStatus::Error => "ERROR",
            AutofixStatus::Completed => "COMPLETED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Error,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutofixStep {
    pub id: String,
    pub index: u32,
    pub title: String,
    pub status: StepStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutofixMetadata {
    Processing {
        created_at: DateTime<Utc>,
        steps: Vec<AutofixStep>,
    },
    Error {
        created_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        #[serde(default)]
        steps: Vec<AutofixStep>,
        /// Always serialized as `null`.
        #[serde(default)]
        fix: (),
        error_message: String,
    },
    Completed {
        created_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        #[serde(default)]
        steps: Vec<AutofixStep>,
        fix: Value,
    },
}

impl AutofixMetadata {
    /// A freshly started run, waiting for Seer to pick it up.
    pub fn started(created_at: DateTime<Utc>) -> Self {
        AutofixMetadata::Processing {
            created_at,
            steps: vec![AutofixStep {
                id: "1".to_string(),
                index: 1,
                title: PLACEHOLDER_STEP_TITLE.to_string(),
                status: StepStatus::Processing,
            }],
        }
    }

    /// A run rejected or failed before Seer accepted it. Carries no steps.
    pub fn failed(
        created_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        error_message: impl Into<String>,
    ) -> Self {
        AutofixMetadata::Error {
            created_at,
            completed_at,
            steps: Vec::new(),
            fix: (),
            error_message: error_message.into(),
        }
    }

    /// Moves a run into the error state, keeping its steps and start time.
    pub fn into_timed_out(self, completed_at: DateTime<Utc>, error_message: &str) -> Self {
        let (created_at, steps) = match self {
            AutofixMetadata::Processing { created_at, steps }
            | AutofixMetadata::Error {
                created_at, steps, ..
            }
            | AutofixMetadata::Completed {
                created_at, steps, ..
            } => (created_at, steps),
        };

        AutofixMetadata::Error {
            created_at,
            completed_at,
            steps,
            fix: (),
            error_message: error_message.to_string(),
        }
    }

    pub fn status(&self) -> AutofixStatus {
        match self {
            AutofixMetadata::Processing { .. } => AutofixStatus::Processing,
            AutofixMetadata::Error { .. } => AutofixStatus::Error,
            AutofixMetadata::Completed { .. } => AutofixStatus::Completed,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            AutofixMetadata::Processing { created_at, .. }
            | AutofixMetadata::Error { created_at, .. }
            | AutofixMetadata::Completed { created_at, .. } => *created_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AutofixMetadata::Processing { .. })
    }
}
