//! Delayed background tasks.
//!
//! A scheduled task is a message that only becomes visible to its consumer
//! once its countdown has elapsed. Scheduling never waits for the countdown.

use crate::models::GroupId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Forces a run into a terminal state if Seer never reports back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeoutCheck {
    pub group_id: GroupId,
    pub created_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ScheduleError {
    #[error("task queue is closed")]
    QueueClosed,
}

#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn schedule(&self, task: TimeoutCheck, countdown: Duration) -> Result<(), ScheduleError>;
}

/// In-process queue: every task is parked on a timer and then delivered on
/// the channel returned by [`DelayQueue::new`].
///
/// Parked tasks live in memory only and are lost on restart.
#[derive(Clone)]
pub struct DelayQueue {
    tx: mpsc::Sender<TimeoutCheck>,
}

impl DelayQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TimeoutCheck>) {
        let (tx, rx) = mpsc::channel(capacity);
        (DelayQueue { tx }, rx)
    }
}

#[async_trait]
impl TaskScheduler for DelayQueue {
    async fn schedule(&self, task: TimeoutCheck, countdown: Duration) -> Result<(), ScheduleError> {
        if self.tx.is_closed() {
            return Err(ScheduleError::QueueClosed);
        }

        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(countdown).await;
            if let Err(err) = tx.send(task).await {
                tracing::error!(
                    group_id = err.0.group_id,
                    created_at = %err.0.created_at,
                    "Dropping timeout check, task queue is closed"
                );
            }
        });

        Ok(())
    }
}
