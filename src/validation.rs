//! Output clip checking.
//!
//! [`check_directory`] probes every clip in a directory in parallel and
//! produces one [`ValidationReport`] per file. A clip is flagged when it is
//! unreadable, has no video stream, or is implausibly small: under one
//! second, under ten frames, under 100 pixels on either side, or under one
//! frame per second.
//!
//! # Example
//!
//! ```no_run
//! use clipsampler::check_directory;
//!
//! let check = check_directory("clips", &["mp4".to_string()], Some(210))?;
//! for file in check.files.iter().filter(|file| !file.report.is_valid()) {
//!     print!("{}:\n{}", file.file, file.report);
//! }
//! println!("{} of {} clips are valid", check.summary.valid, check.summary.total);
//! # Ok::<(), clipsampler::ClipError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;

use crate::error::ClipError;
use crate::metadata::MediaMetadata;
use crate::probe::MediaProbe;

const MIN_DURATION: Duration = Duration::from_secs(1);
const MIN_FRAMES: u64 = 10;
const MIN_SIDE: u32 = 100;
const MIN_FRAMES_PER_SECOND: f64 = 1.0;

/// Findings for one media file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Informational notices (not problems).
    pub info: Vec<String>,
    /// Non-fatal issues, such as an unexpected frame count.
    pub warnings: Vec<String>,
    /// Issues that make the clip unusable.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` if no errors were found. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of entries (info + warnings + errors).
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len() + self.errors.len()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for item in &self.errors {
            writeln!(f, "[ERROR] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

/// Check already-probed metadata. `expected_frames`, when given, adds a
/// warning for any other frame count.
pub fn validate_metadata(metadata: &MediaMetadata, expected_frames: Option<u64>) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(video) = &metadata.video else {
        report.errors.push("No video stream found".to_string());
        return report;
    };

    if metadata.duration < MIN_DURATION {
        report.errors.push(format!(
            "Very short duration ({:.2}s)",
            metadata.duration.as_secs_f64()
        ));
    }
    if video.frame_count < MIN_FRAMES {
        report
            .errors
            .push(format!("Very few frames ({})", video.frame_count));
    }
    if video.width < MIN_SIDE || video.height < MIN_SIDE {
        report.errors.push(format!(
            "Low resolution ({}×{})",
            video.width, video.height
        ));
    }
    if video.frames_per_second < MIN_FRAMES_PER_SECOND {
        report.errors.push(format!(
            "Low frame rate ({:.2} fps)",
            video.frames_per_second
        ));
    }

    if let Some(expected) = expected_frames {
        if video.frame_count != expected {
            report.warnings.push(format!(
                "Expected {expected} frames, found {}",
                video.frame_count
            ));
        }
    }

    report.info.push(format!(
        "Video: {} {}×{} @ {:.2} fps, {} frames, {:.2}s",
        video.codec,
        video.width,
        video.height,
        video.frames_per_second,
        video.frame_count,
        metadata.duration.as_secs_f64(),
    ));

    report
}

/// Result of checking one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileCheck {
    /// File name relative to the checked directory.
    pub file: String,
    pub size_bytes: u64,
    /// `None` when the file could not be probed.
    pub metadata: Option<MediaMetadata>,
    pub report: ValidationReport,
}

impl FileCheck {
    /// Whether the frame-count expectation produced a warning.
    pub fn has_frame_mismatch(&self) -> bool {
        self.report
            .warnings
            .iter()
            .any(|warning| warning.starts_with("Expected "))
    }
}

/// Totals over a checked directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub total: usize,
    pub valid: usize,
    pub errors: usize,
    /// Valid files whose frame count differs from the expectation.
    pub frame_mismatches: usize,
    /// Combined size of the valid files.
    pub valid_bytes: u64,
}

/// Every file check plus the totals, ordered by file name.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryCheck {
    pub files: Vec<FileCheck>,
    pub summary: CheckSummary,
}

/// Probe every file with one of `extensions` in `dir`, in parallel.
///
/// # Errors
///
/// Returns [`ClipError::MissingDirectory`] if `dir` does not exist
/// or [`ClipError::IoError`] if it cannot be listed. Problems with
/// individual files are reported in their [`FileCheck`] instead.
pub fn check_directory<P: AsRef<Path>>(
    dir: P,
    extensions: &[String],
    expected_frames: Option<u64>,
) -> Result<DirectoryCheck, ClipError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ClipError::MissingDirectory(dir.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                extensions
                    .iter()
                    .any(|known| known.trim_start_matches('.').eq_ignore_ascii_case(extension))
            });
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    log::info!("Checking {} files in {}", paths.len(), dir.display());

    let files: Vec<FileCheck> = paths
        .par_iter()
        .map(|path| check_file(path, expected_frames))
        .collect();

    let mut summary = CheckSummary {
        total: files.len(),
        ..CheckSummary::default()
    };
    for file in &files {
        if file.report.is_valid() {
            summary.valid += 1;
            summary.valid_bytes += file.size_bytes;
            if file.has_frame_mismatch() {
                summary.frame_mismatches += 1;
            }
        } else {
            summary.errors += 1;
        }
    }

    Ok(DirectoryCheck { files, summary })
}

fn check_file(path: &Path, expected_frames: Option<u64>) -> FileCheck {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size_bytes = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);

    match MediaProbe::probe(path) {
        Ok(metadata) => FileCheck {
            file,
            size_bytes,
            report: validate_metadata(&metadata, expected_frames),
            metadata: Some(metadata),
        },
        Err(error) => FileCheck {
            file,
            size_bytes,
            metadata: None,
            report: ValidationReport {
                errors: vec![format!("Unreadable: {error}")],
                ..ValidationReport::default()
            },
        },
    }
}
