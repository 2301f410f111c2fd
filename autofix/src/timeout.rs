use crate::metadata::{AUTOFIX_METADATA_KEY, AutofixMetadata, AutofixStatus};
use crate::metrics_defs::AUTOFIX_TIMEOUT;
use crate::scheduler::TimeoutCheck;
use crate::store::{GroupStore, StoreError};
use chrono::Utc;
use shared::counter;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const TIMEOUT_ERROR_MESSAGE: &str = "Autofix timed out.";

#[derive(Debug, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// The run was still processing and has been marked as failed.
    TimedOut,
    /// The run already finished, or a newer run replaced it.
    Superseded,
    /// The group or its autofix record is gone.
    Missing,
}

impl TimeoutOutcome {
    const fn as_str(&self) -> &'static str {
        match self {
            TimeoutOutcome::TimedOut => "timed_out",
            TimeoutOutcome::Superseded => "superseded",
            TimeoutOutcome::Missing => "missing",
        }
    }
}

/// Consumes due timeout checks and fails runs that never reached a terminal state.
///
/// The check reads the record and writes it back without any guard, so a
/// completion arriving in between can still be overwritten.
pub struct TimeoutWatchdog {
    groups: Arc<dyn GroupStore>,
}

impl TimeoutWatchdog {
    pub fn new(groups: Arc<dyn GroupStore>) -> Self {
        Self { groups }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<TimeoutCheck>) {
        while let Some(task) = rx.recv().await {
            match self.check(&task).await {
                Ok(outcome) => {
                    tracing::debug!(
                        group_id = task.group_id,
                        created_at = %task.created_at,
                        outcome = outcome.as_str(),
                        "Timeout check finished"
                    );
                    counter!(AUTOFIX_TIMEOUT, "outcome" => outcome.as_str()).increment(1);
                }
                Err(err) => {
                    tracing::error!(
                        group_id = task.group_id,
                        created_at = %task.created_at,
                        error = %err,
                        "Timeout check failed"
                    );
                    counter!(AUTOFIX_TIMEOUT, "outcome" => "error").increment(1);
                }
            }
        }
    }

    pub async fn check(&self, task: &TimeoutCheck) -> Result<TimeoutOutcome, StoreError> {
        let Some(mut group) = self.groups.get_group(task.group_id).await? else {
            return Ok(TimeoutOutcome::Missing);
        };

        let Some(stored) = group.data.metadata.get(AUTOFIX_METADATA_KEY) else {
            return Ok(TimeoutOutcome::Missing);
        };

        let metadata: AutofixMetadata = match serde_json::from_value(stored.clone()) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(
                    group_id = task.group_id,
                    error = %err,
                    "Unreadable autofix record, leaving it alone"
                );
                return Ok(TimeoutOutcome::Superseded);
            }
        };

        if metadata.status() != AutofixStatus::Processing
            || metadata.created_at() != task.created_at
        {
            return Ok(TimeoutOutcome::Superseded);
        }

        let timed_out = metadata.into_timed_out(Utc::now(), TIMEOUT_ERROR_MESSAGE);
        group.data.metadata.insert(
            AUTOFIX_METADATA_KEY.to_string(),
            serde_json::to_value(&timed_out)?,
        );
        self.groups.save_group(&group).await?;

        Ok(TimeoutOutcome::TimedOut)
    }
}
