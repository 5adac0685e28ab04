//! Error types for the `clipsampler` crate.
//!
//! [`ClipError`] covers everything that can abort a run before tasks are
//! dispatched (bad configuration, unreadable annotations, missing
//! directories) as well as the internal failures of a single extraction.
//! Per-task failures never surface as errors to the caller of the worker
//! pool: they are folded into an
//! [`ExtractionOutcome`](crate::ExtractionOutcome) instead.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `clipsampler` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClipError {
    /// A record in the annotation source could not be parsed.
    #[error("Invalid annotation in {path} at line {line}: {reason}")]
    AnnotationParse {
        /// Annotation file being read.
        path: PathBuf,
        /// One-based line number of the offending record.
        line: u64,
        /// What was wrong with the record.
        reason: String,
    },

    /// The annotation source could not be read at all.
    #[error("Failed to read annotations from {path}: {reason}")]
    AnnotationRead {
        /// Annotation file that was requested.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The configured source directory does not exist.
    #[error("Source directory does not exist: {0}")]
    MissingSourceDirectory(PathBuf),

    /// A directory given to inspect does not exist.
    #[error("Directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    /// A configuration value is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A YAML configuration file could not be parsed.
    #[error("Failed to parse configuration file {path}: {reason}")]
    ConfigurationFile {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A media file could not be opened by FFmpeg.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in {0}")]
    NoVideoStream(PathBuf),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// Re-encoding a clip failed.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// The decode window contained no frames, so nothing was written.
    #[error("No frames in [{start:.3}s, {end:.3}s]")]
    EmptyClip {
        /// Requested start in seconds.
        start: f64,
        /// Requested end in seconds.
        end: f64,
    },

    /// An external tool (`ffmpeg`, `ffprobe`) exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    ExternalTool {
        /// Program name.
        program: String,
        /// Rendered exit status.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// An external tool did not finish within its time budget.
    #[error("{program} timed out after {timeout:?}")]
    Timeout {
        /// Program name.
        program: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// The worker pool could not be started or joined.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for ClipError {
    fn from(error: FfmpegError) -> Self {
        ClipError::FfmpegError(error.to_string())
    }
}
