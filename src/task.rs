//! Processing of a single clip task.
//!
//! [`ClipTask`] bundles what a worker needs (resolver, prober, extractor,
//! output location) and turns one [`ClipSpec`] into one
//! [`ExtractionOutcome`]. The outcome depends only on the clip and the
//! filesystem, never on which worker runs it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::clip::ClipSpec;
use crate::configuration::PipelineConfig;
use crate::extract::Extractor;
use crate::probe::Prober;
use crate::resolver::AssetResolver;
use crate::summary::{ExtractionOutcome, TaskReport};

/// Shared, read-only context for processing clip specs.
pub struct ClipTask {
    resolver: AssetResolver,
    prober: Box<dyn Prober>,
    extractor: Box<dyn Extractor>,
    output_dir: PathBuf,
    output_extension: String,
}

impl ClipTask {
    pub fn new(
        config: &PipelineConfig,
        prober: Box<dyn Prober>,
        extractor: Box<dyn Extractor>,
    ) -> Self {
        Self {
            resolver: AssetResolver::new(config),
            prober,
            extractor,
            output_dir: config.output_dir().to_path_buf(),
            output_extension: config.output_extension().to_string(),
        }
    }

    /// Destination of `spec` under this task's output directory.
    pub fn destination(&self, spec: &ClipSpec) -> PathBuf {
        spec.output_path(&self.output_dir, &self.output_extension)
    }

    /// Resolve, gate, extract, and validate one clip.
    ///
    /// 1. No source asset: [`MissingAsset`](ExtractionOutcome::MissingAsset),
    ///    nothing is written.
    /// 2. A destination that already probes valid is
    ///    [`Skipped`](ExtractionOutcome::Skipped).
    /// 3. Otherwise the clip is extracted and probed again. An invalid
    ///    result is deleted and reported as
    ///    [`Corrupted`](ExtractionOutcome::Corrupted); an extraction error
    ///    removes any partial file and becomes
    ///    [`Failed`](ExtractionOutcome::Failed).
    pub fn run(&self, spec: &ClipSpec) -> TaskReport {
        let outcome = self.outcome(spec);
        TaskReport {
            file: spec.file_name(&self.output_extension),
            spec: spec.clone(),
            outcome,
        }
    }

    fn outcome(&self, spec: &ClipSpec) -> ExtractionOutcome {
        let Some(source) = self.resolver.resolve(&spec.video_id) else {
            log::warn!("No source asset for {}", spec.video_id);
            return ExtractionOutcome::MissingAsset;
        };

        let destination = self.destination(spec);
        if destination.exists() && self.prober.is_valid(&destination) {
            log::debug!("{} already extracted", destination.display());
            return ExtractionOutcome::Skipped;
        }

        if let Err(error) = self.extractor.extract(
            &source,
            &destination,
            spec.start_seconds(),
            spec.duration_seconds(),
        ) {
            remove_partial(&destination);
            return ExtractionOutcome::Failed(error.to_string());
        }

        if self.prober.is_valid(&destination) {
            ExtractionOutcome::Extracted
        } else {
            log::warn!("{} failed validation, deleting", destination.display());
            remove_partial(&destination);
            ExtractionOutcome::Corrupted
        }
    }
}

/// Delete a partially written clip. A missing file is not an error.
pub(crate) fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => log::warn!("Could not remove {}: {error}", path.display()),
    }
}
