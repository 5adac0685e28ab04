//! Progress reporting and cancellation support.
//!
//! [`ProgressCallback`] observes a pool run one outcome at a time, and
//! [`CancellationToken`] stops a run from another thread (a signal handler,
//! a UI) without abandoning tasks that are already being extracted.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use clipsampler::{ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}/{} ({:.1}%)", info.completed, info.total, info.percentage);
//!     }
//! }
//!
//! let callback: Arc<dyn ProgressCallback> = Arc::new(PrintProgress);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::summary::TaskReport;

/// A snapshot of run progress, taken right after one task finished.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Tasks that have produced an outcome so far.
    pub completed: u64,
    /// Tasks in the run.
    pub total: u64,
    /// Completion percentage (0.0 – 100.0). 100 for an empty run.
    pub percentage: f32,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
    /// The report that triggered this update.
    pub last: Option<TaskReport>,
}

/// Receives progress updates from the worker pool.
///
/// Called on the aggregating thread, once per finished task. Callbacks
/// observe but cannot halt the run; use [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Used when no callback is set.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread. The pool checks
/// [`is_cancelled`](CancellationToken::is_cancelled) before dispatching
/// each task.
///
/// # Example
///
/// ```
/// use clipsampler::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.clone().cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks timing for a run and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    completed: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            completed: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one finished task and notify the callback.
    pub(crate) fn advance(&mut self, report: &TaskReport) {
        self.completed += 1;
        self.report(Some(report.clone()));
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn report(&self, last: Option<TaskReport>) {
        let elapsed = self.start_time.elapsed();
        let percentage = if self.total == 0 {
            100.0
        } else {
            (self.completed as f32 / self.total as f32) * 100.0
        };
        let estimated_remaining = if self.completed > 0 {
            let remaining = self.total.saturating_sub(self.completed);
            Some(elapsed.mul_f64(remaining as f64 / self.completed as f64))
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            completed: self.completed,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            last,
        });
    }
}
