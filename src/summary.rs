//! Extraction outcomes and run aggregation.
//!
//! Every dispatched [`ClipSpec`] produces exactly one [`TaskReport`]. The
//! [`RunSummary`] folds reports into per-kind counts on the calling thread,
//! in completion order.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::Serialize;

use crate::clip::ClipSpec;

/// Terminal state of one extraction task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason")]
pub enum ExtractionOutcome {
    /// A valid clip already existed at the destination.
    Skipped,
    /// The clip was written and passed the validity probe.
    Extracted,
    /// No source asset exists for the video id. Nothing was written.
    MissingAsset,
    /// The written clip failed the validity probe and was deleted.
    Corrupted,
    /// Extraction raised an error. Any partial file was deleted.
    Failed(String),
}

impl ExtractionOutcome {
    /// The status word used in report lines.
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionOutcome::Skipped => "Skipped",
            ExtractionOutcome::Extracted => "Extracted",
            ExtractionOutcome::MissingAsset => "MissingAsset",
            ExtractionOutcome::Corrupted => "Corrupted",
            ExtractionOutcome::Failed(_) => "Failed",
        }
    }

    /// Whether the task ended with a usable clip on disk.
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Skipped | ExtractionOutcome::Extracted)
    }
}

/// Outcome of one task together with the clip it concerns.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub spec: ClipSpec,
    /// Output file name (not the full path).
    pub file: String,
    pub outcome: ExtractionOutcome,
}

impl Display for TaskReport {
    /// `Extracted: v1_12s_7s.mp4`, or `Failed: v1_12s_7s.mp4: <reason>`.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.outcome {
            ExtractionOutcome::Failed(reason) => write!(f, "Failed: {}: {reason}", self.file),
            outcome => write!(f, "{}: {}", outcome.label(), self.file),
        }
    }
}

/// Counts per outcome kind for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Tasks in the deduplicated task list.
    pub total: usize,
    pub skipped: usize,
    pub extracted: usize,
    pub missing_asset: usize,
    pub corrupted: usize,
    pub failed: usize,
    /// Tasks never dispatched because the run was cancelled.
    pub not_run: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: &ExtractionOutcome) {
        match outcome {
            ExtractionOutcome::Skipped => self.skipped += 1,
            ExtractionOutcome::Extracted => self.extracted += 1,
            ExtractionOutcome::MissingAsset => self.missing_asset += 1,
            ExtractionOutcome::Corrupted => self.corrupted += 1,
            ExtractionOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Number of tasks that produced an outcome.
    pub fn completed(&self) -> usize {
        self.skipped + self.extracted + self.missing_asset + self.corrupted + self.failed
    }

    /// Whether any task ended without a usable clip.
    pub fn has_failures(&self) -> bool {
        self.missing_asset + self.corrupted + self.failed > 0
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "Total tasks:   {}", self.total)?;
        writeln!(f, "  Extracted:    {}", self.extracted)?;
        writeln!(f, "  Skipped:      {}", self.skipped)?;
        writeln!(f, "  MissingAsset: {}", self.missing_asset)?;
        writeln!(f, "  Corrupted:    {}", self.corrupted)?;
        write!(f, "  Failed:       {}", self.failed)?;
        if self.not_run > 0 {
            write!(f, "\n  Not run:      {}", self.not_run)?;
        }
        Ok(())
    }
}
