//! # clipsampler
//!
//! Turn sparse, per-video event annotations into a set of bounded-duration
//! video clips, and extract them with FFmpeg, resumably and in parallel.
//!
//! A run has two halves. Planning turns annotations (or, without
//! annotations, raw video durations) into a deduplicated list of
//! [`ClipSpec`]s. Extraction hands that list to a [`WorkerPool`], which
//! resolves each source asset, skips clips that already exist and probe
//! valid, cuts the rest, and deletes anything that comes out corrupt.
//!
//! ## Quick Start
//!
//! ### Sample clips around annotated events
//!
//! ```no_run
//! use clipsampler::{PipelineConfig, WorkerPool, plan_from_annotations};
//!
//! let config = PipelineConfig::new()
//!     .with_source_dir("videos/trainval")
//!     .with_output_dir("sampled_clips");
//! let tasks = plan_from_annotations("ava_train_v2.2.csv", &config)?;
//! let run = WorkerPool::from_config(&config).run(tasks.as_slice())?;
//! for report in &run.reports {
//!     println!("{report}");
//! }
//! println!("{}", run.summary);
//! # Ok::<(), clipsampler::ClipError>(())
//! ```
//!
//! ### Cut whole videos into fixed windows
//!
//! ```no_run
//! use std::path::Path;
//!
//! use clipsampler::{MediaProbe, PipelineConfig, WorkerPool, plan_from_windows};
//!
//! let config = PipelineConfig::new().with_source_dir("videos");
//! let tasks = plan_from_windows(Some(Path::new("relevant_ids.txt")), &config, &MediaProbe)?;
//! WorkerPool::from_config(&config).run(tasks.as_slice())?;
//! # Ok::<(), clipsampler::ClipError>(())
//! ```
//!
//! ## Features
//!
//! - **Temporal clustering** of event timestamps into clips centered on the
//!   busiest instant, with clamped durations
//! - **Sliding windows** over full videos, optionally restricted to a list
//!   of relevant ids
//! - **Frame-accurate extraction** (decode and re-encode through
//!   `ffmpeg-next`) or fast **stream copy** through the `ffmpeg` tool
//! - **Resumable runs**: clips that already probe valid are skipped
//! - **Corruption cleanup**: clips that fail the `ffprobe` frame check are
//!   deleted
//! - **Progress & cancellation** through [`ProgressCallback`] and
//!   [`CancellationToken`]
//! - **Output checking** of a clip directory in parallel
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build, and the
//! `ffmpeg` and `ffprobe` tools must be on `PATH` at run time.

pub mod annotation;
pub mod clip;
pub mod cluster;
mod command;
pub mod configuration;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod metadata;
pub mod plan;
pub mod pool;
pub mod probe;
pub mod progress;
pub mod resolver;
pub mod summary;
pub mod task;
pub mod validation;
pub mod window;

pub use annotation::{RawEvent, VideoEvents, group_by_video, read_annotations, read_video_ids};
pub use clip::{ClipSpec, ClipWindow, TaskList};
pub use cluster::{cluster_timestamps, plan_clusters};
pub use configuration::{ClusterOptions, ExtractionStrategy, PipelineConfig, WindowOptions};
pub use error::ClipError;
pub use extract::{Extractor, FrameAccurateExtractor, StreamCopyExtractor, extractor_for};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use metadata::{MediaMetadata, VideoMetadata};
pub use plan::{plan_from_annotations, plan_from_windows};
pub use pool::{RunReport, WorkerPool};
pub use probe::{DurationProbe, FfprobeProber, MediaProbe, Prober};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use resolver::AssetResolver;
pub use summary::{ExtractionOutcome, RunSummary, TaskReport};
pub use task::ClipTask;
pub use validation::{
    CheckSummary, DirectoryCheck, FileCheck, ValidationReport, check_directory, validate_metadata,
};
pub use window::{plan_windows, sliding_windows};
