//! Build job tracking

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::target::Target;

/// One build attempt for a single target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildJob {
    /// Target being built
    pub target: Target,

    /// Skip the package test phase
    pub skip_tests: bool,

    /// Per-target log file, when output is redirected
    pub log_path: Option<PathBuf>,

    /// Current status
    pub status: JobStatus,

    /// Start time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// End time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Error message if failed
    pub error: Option<String>,
}

/// Job status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Dispatched but not started
    Pending,

    /// Job is running
    Running,

    /// Job succeeded
    Succeeded,

    /// Job failed
    Failed,

    /// Job declined to start because another job had already failed
    Skipped,
}

impl BuildJob {
    /// Create a new pending job
    pub fn new(target: Target, skip_tests: bool) -> Self {
        Self {
            target,
            skip_tests,
            log_path: None,
            status: JobStatus::Pending,
            start_time: None,
            end_time: None,
            error: None,
        }
    }

    /// Mark job as started
    pub fn start(&mut self) {
        self.status = JobStatus::Running;
        self.start_time = Some(Utc::now());
    }

    /// Mark job as completed successfully
    pub fn succeed(&mut self) {
        self.status = JobStatus::Succeeded;
        self.end_time = Some(Utc::now());
    }

    /// Mark job as failed
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.end_time = Some(Utc::now());
        self.error = Some(error.into());
    }

    /// Mark job as skipped
    pub fn skip(&mut self) {
        self.status = JobStatus::Skipped;
        self.end_time = Some(Utc::now());
    }

    /// Wall-clock duration in seconds, if the job ran
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

impl JobStatus {
    /// Check if the job was successful
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Check if the job failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Skipped => write!(f, "skipped"),
        }
    }
}
