//! Clip specifications and the task deduplicator.
//!
//! A [`ClipSpec`] is the unit of work handed to the worker pool. Its three
//! fields are exactly the ones that form the output file name, so keeping
//! specs unique (which [`TaskList`] does) is what guarantees that no two
//! workers ever write to the same path.

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A `(center, duration)` pair before it is attached to a video.
///
/// Produced by the clustering engine and the sliding-window generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipWindow {
    /// Clip center in whole seconds.
    pub center: u64,
    /// Clip length in whole seconds.
    pub duration: u32,
}

/// A single bounded-duration extraction target.
///
/// # Example
///
/// ```
/// use clipsampler::ClipSpec;
///
/// let spec = ClipSpec::new("-5KQ66BBWC4", 905, 7);
/// assert_eq!(spec.file_name("mp4"), "-5KQ66BBWC4_905s_7s.mp4");
/// assert_eq!(spec.start_seconds(), 901.5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClipSpec {
    pub video_id: String,
    pub center: u64,
    pub duration: u32,
}

impl ClipSpec {
    pub fn new<S: Into<String>>(video_id: S, center: u64, duration: u32) -> Self {
        Self {
            video_id: video_id.into(),
            center,
            duration,
        }
    }

    /// Attach a [`ClipWindow`] to a video.
    pub fn from_window<S: Into<String>>(video_id: S, window: ClipWindow) -> Self {
        Self::new(video_id, window.center, window.duration)
    }

    /// `{video_id}_{center}s_{duration}s.{extension}`.
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "{}_{}s_{}s.{}",
            self.video_id,
            self.center,
            self.duration,
            extension.trim_start_matches('.'),
        )
    }

    /// Destination of this clip inside `output_dir`.
    pub fn output_path(&self, output_dir: &Path, extension: &str) -> PathBuf {
        output_dir.join(self.file_name(extension))
    }

    /// Clip start in seconds, clamped at zero for clips near the beginning
    /// of a video.
    pub fn start_seconds(&self) -> f64 {
        (self.center as f64 - f64::from(self.duration) / 2.0).max(0.0)
    }

    pub fn duration_seconds(&self) -> f64 {
        f64::from(self.duration)
    }
}

impl Display for ClipSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}@{}s+{}s", self.video_id, self.center, self.duration)
    }
}

/// An order-preserving set of clip specifications.
///
/// Pushing a spec that is already present is a no-op, so concatenating the
/// output of several generators yields a list in which every spec, and
/// therefore every output path, is unique. The first occurrence wins, which
/// keeps enumeration order stable for a given input.
#[derive(Debug, Clone, Default)]
pub struct TaskList {
    specs: Vec<ClipSpec>,
    seen: HashSet<ClipSpec>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `spec` unless it was already seen. Returns `true` if added.
    pub fn push(&mut self, spec: ClipSpec) -> bool {
        if self.seen.contains(&spec) {
            return false;
        }
        self.seen.insert(spec.clone());
        self.specs.push(spec);
        true
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClipSpec> {
        self.specs.iter()
    }

    pub fn as_slice(&self) -> &[ClipSpec] {
        &self.specs
    }

    pub fn into_vec(self) -> Vec<ClipSpec> {
        self.specs
    }
}

impl Extend<ClipSpec> for TaskList {
    fn extend<I: IntoIterator<Item = ClipSpec>>(&mut self, specs: I) {
        for spec in specs {
            self.push(spec);
        }
    }
}

impl FromIterator<ClipSpec> for TaskList {
    fn from_iter<I: IntoIterator<Item = ClipSpec>>(specs: I) -> Self {
        let mut list = TaskList::new();
        list.extend(specs);
        list
    }
}

impl IntoIterator for TaskList {
    type Item = ClipSpec;
    type IntoIter = std::vec::IntoIter<ClipSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.into_iter()
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a ClipSpec;
    type IntoIter = std::slice::Iter<'a, ClipSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
