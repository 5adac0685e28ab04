//! Bounded worker pool for clip extraction.
//!
//! A dispatcher thread feeds clip specs into a bounded
//! [`crossbeam_channel`] queue, a fixed number of worker threads pull from
//! it, and every [`TaskReport`] comes back over a results channel to the
//! calling thread, which is the only place outcomes are aggregated.
//!
//! ```text
//! [dispatcher] --ClipSpec--> [worker × N] --TaskReport--> [caller: RunSummary]
//! ```
//!
//! # Example
//!
//! ```no_run
//! use clipsampler::{ClipSpec, PipelineConfig, WorkerPool};
//!
//! let config = PipelineConfig::new()
//!     .with_source_dir("videos")
//!     .with_output_dir("clips");
//! let pool = WorkerPool::from_config(&config);
//! let run = pool.run(&[ClipSpec::new("-5KQ66BBWC4", 905, 7)])?;
//! println!("{}", run.summary);
//! # Ok::<(), clipsampler::ClipError>(())
//! ```

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::clip::ClipSpec;
use crate::configuration::PipelineConfig;
use crate::error::ClipError;
use crate::extract::{Extractor, extractor_for};
use crate::probe::{FfprobeProber, Prober};
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback, ProgressTracker};
use crate::summary::{ExtractionOutcome, RunSummary, TaskReport};
use crate::task::{ClipTask, remove_partial};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// One report per dispatched task, in completion order.
    pub reports: Vec<TaskReport>,
}

/// Fixed-size pool of extraction threads.
pub struct WorkerPool {
    task: ClipTask,
    config: PipelineConfig,
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
}

impl WorkerPool {
    /// Pool using the given probe and extraction capabilities.
    pub fn new(
        config: &PipelineConfig,
        prober: Box<dyn Prober>,
        extractor: Box<dyn Extractor>,
    ) -> Self {
        Self {
            task: ClipTask::new(config, prober, extractor),
            config: config.clone(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Pool using `ffprobe` for validation and the configured strategy
    /// for extraction.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config,
            Box::new(FfprobeProber::new(config.probe_timeout())),
            extractor_for(config),
        )
    }

    /// Receive a [`ProgressInfo`](crate::ProgressInfo) after every task.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Stop dispatching once `token` is cancelled. Tasks already being
    /// extracted run to completion; the rest are counted as not run.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Process every spec and aggregate the outcomes.
    ///
    /// Per-task problems never abort the run; they show up as outcomes.
    ///
    /// # Errors
    ///
    /// Fails before any task is dispatched if the source directory is
    /// missing, the output directory cannot be created, or a worker thread
    /// cannot be spawned.
    pub fn run(&self, specs: &[ClipSpec]) -> Result<RunReport, ClipError> {
        let source_dir = self.config.source_dir();
        if !source_dir.is_dir() {
            return Err(ClipError::MissingSourceDirectory(source_dir.to_path_buf()));
        }
        fs::create_dir_all(self.config.output_dir())?;

        let total = specs.len();
        let worker_count = self.config.worker_count().clamp(1, total.max(1));
        log::info!("Dispatching {total} tasks to {worker_count} workers");

        let mut summary = RunSummary::new(total);
        let mut reports = Vec::with_capacity(total);
        let mut tracker = ProgressTracker::new(Arc::clone(&self.progress), total as u64);

        let (task_sender, task_receiver) = bounded::<&ClipSpec>(worker_count * 2);
        let (result_sender, result_receiver) = unbounded::<TaskReport>();

        thread::scope(|scope| -> Result<(), ClipError> {
            for index in 0..worker_count {
                let tasks = task_receiver.clone();
                let results = result_sender.clone();
                thread::Builder::new()
                    .name(format!("clip-worker-{index}"))
                    .spawn_scoped(scope, move || self.work(tasks, results))
                    .map_err(|error| {
                        ClipError::WorkerPool(format!("cannot spawn worker {index}: {error}"))
                    })?;
            }
            // Workers hold the only result senders, so the loop below ends
            // once all of them have exited.
            drop(result_sender);
            drop(task_receiver);

            scope.spawn(move || {
                for spec in specs {
                    if self.is_cancelled() {
                        log::warn!("Cancelled, not dispatching remaining tasks");
                        break;
                    }
                    if task_sender.send(spec).is_err() {
                        break;
                    }
                }
            });

            for report in result_receiver {
                summary.record(&report.outcome);
                tracker.advance(&report);
                reports.push(report);
            }
            Ok(())
        })?;

        summary.not_run = total - summary.completed();
        summary.elapsed = tracker.elapsed();
        Ok(RunReport { summary, reports })
    }

    fn work(&self, tasks: Receiver<&ClipSpec>, results: Sender<TaskReport>) {
        for spec in tasks {
            // Queued but not started: leave it to the not-run count.
            if self.is_cancelled() {
                continue;
            }
            let report = panic::catch_unwind(AssertUnwindSafe(|| self.task.run(spec)))
                .unwrap_or_else(|_| {
                    log::error!("Worker panicked while processing {spec}");
                    remove_partial(&self.task.destination(spec));
                    TaskReport {
                        file: spec.file_name(self.config.output_extension()),
                        spec: spec.clone(),
                        outcome: ExtractionOutcome::Failed("worker panicked".to_string()),
                    }
                });
            if results.send(report).is_err() {
                break;
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
