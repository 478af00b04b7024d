//! Build orchestration logic
//!
//! Targets are queued in order and pulled by a fixed pool of worker tasks.
//! Each worker runs one job to completion before taking the next, so a pool
//! of one builds strictly in target order. A listener task turns shutdown
//! requests into a kill sweep over the running containers.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use pkgfarm_core::{BuildJob, Target};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::context::BuildContext;
use crate::error::{BuildError, BuildJobError};
use crate::executor::BuildExecutor;
use crate::progress_ui::{JobEvent, NoOpProgressUI, ProgressUI};
use crate::report::BuildReport;

type JobOutcome = (usize, BuildJob, Option<BuildJobError>);

/// Runs a set of targets over a bounded worker pool
pub struct Orchestrator {
    context: Arc<BuildContext>,
    executor: BuildExecutor,
    progress: Arc<dyn ProgressUI>,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(context: Arc<BuildContext>) -> Self {
        let executor = BuildExecutor::new(Arc::clone(&context));
        Self::with_executor(context, executor)
    }

    /// Create an orchestrator around a preconfigured executor
    pub fn with_executor(context: Arc<BuildContext>, executor: BuildExecutor) -> Self {
        Self { context, executor, progress: Arc::new(NoOpProgressUI) }
    }

    /// Report job events to a progress UI
    pub fn with_progress(mut self, progress: Arc<dyn ProgressUI>) -> Self {
        self.progress = progress;
        self
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.context
    }

    /// Build every target and return the report with the first failure.
    ///
    /// Jobs that had not started when a failure (or interrupt) was observed
    /// are reported as skipped.
    pub async fn execute(&self, targets: Vec<Target>) -> (BuildReport, Option<BuildJobError>) {
        let started = Utc::now();
        let total = targets.len();
        let settings = self.context.settings();
        let skip_tests = settings.skip_tests;
        let width = settings.concurrency.min(total).max(1);

        info!("Building {} target(s) with {} worker(s)", total, width);

        let listener = self.spawn_interrupt_listener();

        let queue: Arc<Mutex<VecDeque<(usize, Target)>>> =
            Arc::new(Mutex::new(targets.iter().cloned().enumerate().collect()));

        let mut workers = JoinSet::new();
        for worker_id in 0..width {
            let queue = Arc::clone(&queue);
            let context = Arc::clone(&self.context);
            let executor = self.executor.clone();
            let progress = Arc::clone(&self.progress);

            workers.spawn(async move {
                let mut outcomes: Vec<JobOutcome> = Vec::new();
                loop {
                    let next = queue.lock().pop_front();
                    let Some((index, target)) = next else { break };
                    debug!("Worker {} took {}", worker_id, target);

                    if !context.failure().is_set() {
                        progress.update(&JobEvent::Started {
                            target: target.clone(),
                            position: index + 1,
                            total,
                        });
                    }

                    let mut job = BuildJob::new(target, skip_tests);
                    let outcome = executor.run(&mut job).await;

                    progress.update(&JobEvent::Finished {
                        target: job.target.clone(),
                        status: job.status,
                        error: job.error.clone(),
                    });
                    outcomes.push((index, job, outcome.err()));
                }
                outcomes
            });
        }

        let mut slots: Vec<Option<(BuildJob, Option<BuildJobError>)>> =
            (0..total).map(|_| None).collect();
        let mut lost_reason = None;

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcomes) => {
                    for (index, job, error) in outcomes {
                        slots[index] = Some((job, error));
                    }
                }
                Err(e) => {
                    error!("Build worker terminated unexpectedly: {}", e);
                    self.context.failure().trip();
                    lost_reason.get_or_insert_with(|| e.to_string());
                }
            }
        }

        listener.abort();
        self.progress.finish();

        let first_target = self.context.failure().first_target();
        let mut first_error: Option<BuildJobError> = None;
        let mut jobs = Vec::with_capacity(total);

        for (slot, target) in slots.into_iter().zip(targets) {
            let (job, error) = slot.unwrap_or_else(|| {
                let reason = lost_reason.clone().unwrap_or_else(|| "no result".to_string());
                lost_job(target, skip_tests, reason)
            });

            // Prefer the error of the target that tripped the flag first
            if let Some(error) = error {
                let replace = match &first_error {
                    None => true,
                    Some(current) => {
                        first_target.as_ref() == Some(&error.target)
                            && first_target.as_ref() != Some(&current.target)
                    }
                };
                if replace {
                    first_error = Some(error);
                }
            }
            jobs.push(job);
        }

        let report = BuildReport { jobs, started, finished: Utc::now() };
        info!(
            "Build run finished: {} built, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped()
        );

        (report, first_error)
    }

    /// Build every target, surfacing the first failure as an error
    pub async fn run_builds(&self, targets: Vec<Target>) -> Result<BuildReport, BuildJobError> {
        match self.execute(targets).await {
            (_, Some(error)) => Err(error),
            (report, None) => Ok(report),
        }
    }

    fn spawn_interrupt_listener(&self) -> JoinHandle<()> {
        let context = Arc::clone(&self.context);
        let mut receiver = context.shutdown().shutdown_receiver();

        if context.is_shutdown_requested() {
            context.failure().trip();
        }

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(signal) => {
                        warn!("Caught interrupt ({}), stopping builds", signal.reason);
                        context.failure().trip();
                        let killed = context.registry().kill_all().await;
                        info!("Killed {} running container(s)", killed);
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

fn lost_job(target: Target, skip_tests: bool, reason: String) -> (BuildJob, Option<BuildJobError>) {
    let source = BuildError::WorkerLost { reason };
    let mut job = BuildJob::new(target, skip_tests);
    job.fail(source.to_string());
    let error = BuildJobError::new(job.target.clone(), source);
    (job, Some(error))
}
