//! Outcome of a build run

use std::time::Duration;

use chrono::{DateTime, Utc};
use pkgfarm_core::{BuildJob, JobStatus};
use serde::{Deserialize, Serialize};

/// Per-target outcomes of one run, in target order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub jobs: Vec<BuildJob>,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl BuildReport {
    fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(JobStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(JobStatus::Skipped)
    }

    /// True when every job succeeded
    pub fn is_success(&self) -> bool {
        self.jobs.iter().all(|job| job.status.is_success())
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> Duration {
        (self.finished - self.started).to_std().unwrap_or_default()
    }

    /// Human-readable summary, one line per target
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} built, {} failed, {} skipped in {:.1}s (started {})\n",
            self.succeeded(),
            self.failed(),
            self.skipped(),
            self.duration().as_secs_f64(),
            self.started.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        for job in &self.jobs {
            summary.push_str(&format!("  {:<24} {}", job.target.as_str(), job.status));
            if let Some(secs) = job.duration_secs() {
                summary.push_str(&format!(" ({secs:.1}s)"));
            }
            if let Some(path) = &job.log_path {
                summary.push_str(&format!(" log: {}", path.display()));
            }
            summary.push('\n');
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use pkgfarm_core::Target;

    use super::*;

    #[test]
    fn test_counts_and_summary() {
        let mut ok = BuildJob::new(Target::new("debian:bookworm"), false);
        ok.start();
        ok.succeed();
        let mut bad = BuildJob::new(Target::new("ubuntu:jammy"), false);
        bad.start();
        bad.fail("Container buildjob_jammy exited with code 2");
        let mut skipped = BuildJob::new(Target::new("ubuntu:noble"), false);
        skipped.skip();

        let now = Utc::now();
        let report = BuildReport { jobs: vec![ok, bad, skipped], started: now, finished: now };

        assert_eq!((report.succeeded(), report.failed(), report.skipped()), (1, 1, 1));
        assert!(!report.is_success());

        let summary = report.summary();
        assert!(summary.starts_with("1 built, 1 failed, 1 skipped"));
        assert!(summary.contains("ubuntu:jammy"));
        assert!(summary.contains("failed"));
    }

    #[test]
    fn test_empty_report_is_success() {
        let now = Utc::now();
        let report = BuildReport { jobs: Vec::new(), started: now, finished: now };
        assert!(report.is_success());
        assert_eq!(report.duration(), Duration::ZERO);
    }
}
