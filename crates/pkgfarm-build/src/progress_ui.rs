//! Progress UI components for build visualization
//!
//! The orchestrator reports [`JobEvent`]s; a [`ProgressUI`] turns them into
//! terminal output. With a single worker the container output is shown live,
//! so only the no-op implementation should be used there.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use pkgfarm_core::{JobStatus, Target};
use tracing::{error, info};

/// Lifecycle notifications for one build job
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// A worker picked up the target
    Started { target: Target, position: usize, total: usize },
    /// The job reached a terminal status
    Finished { target: Target, status: JobStatus, error: Option<String> },
}

/// Trait for progress UI implementations
pub trait ProgressUI: Send + Sync {
    /// Update the UI with a job event
    fn update(&self, event: &JobEvent);

    /// Finish the progress display
    fn finish(&self);
}

/// Indicatif-based progress UI implementation
pub struct IndicatifProgressUI {
    /// Multi-progress container for parallel builds
    multi_progress: MultiProgress,
    /// Overall progress bar
    main_bar: ProgressBar,
    /// One spinner per started target
    target_bars: Mutex<HashMap<Target, ProgressBar>>,
    start_time: Instant,
}

impl IndicatifProgressUI {
    /// Create a UI for a run of `total` targets
    pub fn new(total: usize) -> Self {
        let multi_progress = MultiProgress::new();

        let main_bar = multi_progress.add(ProgressBar::new(total as u64));
        let style = ProgressStyle::default_bar()
            .template(
                "{prefix:.bold.dim} {spinner:.green} [{elapsed_precise}] \
                 [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
            )
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        main_bar.set_style(style);
        main_bar.set_prefix("Building targets");

        Self {
            multi_progress,
            main_bar,
            target_bars: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    fn create_target_bar(&self, target: &Target) -> ProgressBar {
        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_prefix(format!("  {target}"));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn handle_started(&self, target: &Target, position: usize, total: usize) {
        let pb = self.create_target_bar(target);
        pb.set_message("Building...");
        self.target_bars.lock().insert(target.clone(), pb);

        self.main_bar.set_message(format!("{target} [{position}/{total}]"));
    }

    fn handle_finished(&self, target: &Target, status: JobStatus, error: Option<&str>) {
        if let Some(pb) = self.target_bars.lock().get(target) {
            match status {
                JobStatus::Succeeded => pb.finish_with_message("✓ Complete"),
                JobStatus::Skipped => pb.finish_with_message("- Skipped"),
                _ => pb.finish_with_message(format!("✗ {}", error.unwrap_or("Failed"))),
            }
        }

        if status == JobStatus::Failed {
            self.multi_progress
                .println(format!("ERROR: {target}: {}", error.unwrap_or("build failed")))
                .ok();
        }

        self.main_bar.inc(1);
    }
}

impl ProgressUI for IndicatifProgressUI {
    fn update(&self, event: &JobEvent) {
        match event {
            JobEvent::Started { target, position, total } => {
                self.handle_started(target, *position, *total);
            }
            JobEvent::Finished { target, status, error } => {
                self.handle_finished(target, *status, error.as_deref());
            }
        }
    }

    fn finish(&self) {
        for pb in self.target_bars.lock().values() {
            if !pb.is_finished() {
                pb.finish();
            }
        }

        let elapsed = self.start_time.elapsed();
        self.main_bar.finish_with_message(format!("done in {elapsed:.1?}"));
    }
}

/// Progress UI that only logs
pub struct NoOpProgressUI;

impl ProgressUI for NoOpProgressUI {
    fn update(&self, event: &JobEvent) {
        match event {
            JobEvent::Started { target, position, total } => {
                info!("Building {} [{}/{}]", target, position, total);
            }
            JobEvent::Finished { target, status: JobStatus::Failed, error } => {
                error!("{} failed: {}", target, error.as_deref().unwrap_or("unknown error"));
            }
            JobEvent::Finished { target, status, .. } => {
                info!("{}: {}", target, status);
            }
        }
    }

    fn finish(&self) {}
}
