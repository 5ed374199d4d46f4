//! Job record model
//!
//! A job record is created once, in the pending state, by the submission
//! command. Later states are written by the execution engine, which lives
//! outside this server; the transition table below is what it must respect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress denominator every job starts with
pub const INITIAL_PROGRESS_TOTAL: u32 = 100;

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    /// Status string as stored in the job document
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Spark job pending..",
            JobStatus::Running => "Spark job running..",
            JobStatus::Done => "Spark job done.",
            JobStatus::Failed => "Spark job failed.",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Done,
            JobStatus::Failed,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Job status cannot change from '{from}' to '{to}'")]
pub struct InvalidTransition {
    pub from: String,
    pub to: JobStatus,
}

/// Body persisted in the jobs index. The id is the document id, not a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDocument {
    pub current: u32,
    pub total: u32,
    pub status: String,
    pub start_time: DateTime<Utc>,
}

/// A job as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub current: u32,
    pub total: u32,
    pub status: String,
    pub start_time: DateTime<Utc>,
}

impl JobRecord {
    /// A freshly submitted job: no progress, pending, started now
    pub fn pending(id: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            current: 0,
            total: INITIAL_PROGRESS_TOTAL,
            status: JobStatus::Pending.as_str().to_string(),
            start_time,
        }
    }

    pub fn from_document(id: impl Into<String>, document: JobDocument) -> Self {
        Self {
            id: id.into(),
            current: document.current,
            total: document.total,
            status: document.status,
            start_time: document.start_time,
        }
    }

    pub fn to_document(&self) -> JobDocument {
        JobDocument {
            current: self.current,
            total: self.total,
            status: self.status.clone(),
            start_time: self.start_time,
        }
    }

    /// Known status, if the stored string is one of ours
    pub fn job_status(&self) -> Option<JobStatus> {
        JobStatus::parse(&self.status)
    }

    /// Move to `next` if the transition table allows it
    pub fn transition(&mut self, next: JobStatus) -> Result<(), InvalidTransition> {
        match self.job_status() {
            Some(current) if current.can_transition_to(next) => {
                self.status = next.as_str().to_string();
                if next == JobStatus::Done {
                    self.current = self.total;
                }
                Ok(())
            },
            _ => Err(InvalidTransition {
                from: self.status.clone(),
                to: next,
            }),
        }
    }
}
