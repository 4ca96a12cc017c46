//! Task handler contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::TaskError;
use super::job::Job;

/// Executes one kind of job
///
/// Handlers run concurrently with each other and must not share mutable
/// state outside of the stores they are given.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), TaskError>;
}

/// What the processor did with a delivered job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retrying { retried: u32, next_at: DateTime<Utc> },
    Archived { reason: String },
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Retrying { .. } => "retrying",
            Self::Archived { .. } => "archived",
        }
    }
}
