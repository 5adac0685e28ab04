//! Pipeline configuration.
//!
//! [`PipelineConfig`] is built once at process start and handed by reference
//! to every component constructor. It is a builder: start from
//! [`PipelineConfig::new`] (or a YAML file via
//! [`PipelineConfig::from_yaml_file`]) and chain `with_*` calls, then call
//! [`validate`](PipelineConfig::validate) before building tasks.
//!
//! # Example
//!
//! ```
//! use clipsampler::{ClusterOptions, ExtractionStrategy, PipelineConfig};
//!
//! let config = PipelineConfig::new()
//!     .with_source_dir("videos/trainval")
//!     .with_output_dir("sampled_clips")
//!     .with_cluster_options(ClusterOptions {
//!         window: 5.0,
//!         min_duration: 7,
//!         max_duration: 15,
//!         buffer: 1.0,
//!     })
//!     .with_strategy(ExtractionStrategy::StreamCopy)
//!     .with_worker_count(8);
//! config.validate()?;
//! # Ok::<(), clipsampler::ClipError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClipError;

/// How a clip is cut out of its source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    /// Decode from the preceding keyframe and re-encode exactly the frames
    /// inside the clip window. This is the default.
    #[default]
    FrameAccurate,
    /// Trim with the `ffmpeg` tool, copying the video stream as-is and
    /// dropping audio. Boundaries snap to keyframes.
    StreamCopy,
}

impl Display for ExtractionStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExtractionStrategy::FrameAccurate => write!(f, "frame-accurate"),
            ExtractionStrategy::StreamCopy => write!(f, "stream-copy"),
        }
    }
}

impl FromStr for ExtractionStrategy {
    type Err = ClipError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "frame-accurate" | "accurate" | "reencode" | "re-encode" => {
                Ok(ExtractionStrategy::FrameAccurate)
            }
            "stream-copy" | "copy" => Ok(ExtractionStrategy::StreamCopy),
            other => Err(ClipError::InvalidConfiguration(format!(
                "unknown extraction strategy: {other}"
            ))),
        }
    }
}

/// Parameters of the temporal clustering engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterOptions {
    /// Linkage threshold in seconds: a timestamp joins the open cluster when
    /// it is strictly closer than this to the cluster's last member.
    pub window: f64,
    /// Shortest clip that will be produced, in seconds.
    pub min_duration: u32,
    /// Longest clip that will be produced, in seconds.
    pub max_duration: u32,
    /// Seconds added to a cluster's span before clamping.
    pub buffer: f64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            window: 5.0,
            min_duration: 7,
            max_duration: 15,
            buffer: 1.0,
        }
    }
}

/// Parameters of the sliding-window generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOptions {
    /// Window length in seconds.
    pub window_size: u32,
    /// Distance between consecutive window starts, in seconds.
    pub stride: u32,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            window_size: 15,
            stride: 15,
        }
    }
}

/// Immutable run configuration shared by every component.
///
/// All fields have defaults matching the original dataset tooling, so a
/// default-constructed config only needs its directories set.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub(crate) cluster: ClusterOptions,
    pub(crate) windows: WindowOptions,
    pub(crate) strategy: ExtractionStrategy,
    pub(crate) source_dir: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) worker_count: usize,
    /// Candidate extensions, without the leading dot, tried in order.
    pub(crate) source_extensions: Vec<String>,
    pub(crate) output_extension: String,
    /// Constant rate factor for the frame-accurate re-encode.
    pub(crate) crf: u32,
    pub(crate) probe_timeout: Duration,
    pub(crate) extract_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// Create a configuration with default settings.
    ///
    /// Defaults: cluster window 5 s, clips 7–15 s with a 1 s buffer, 15 s
    /// sliding windows at a 15 s stride, frame-accurate extraction, 8
    /// workers, sources tried as `.mp4`, `.mkv`, `.webm`, `.mp4` output,
    /// CRF 28, 10 s probe timeout, 10 min extraction timeout.
    pub fn new() -> Self {
        Self {
            cluster: ClusterOptions::default(),
            windows: WindowOptions::default(),
            strategy: ExtractionStrategy::default(),
            source_dir: PathBuf::from("videos"),
            output_dir: PathBuf::from("clips"),
            worker_count: 8,
            source_extensions: vec!["mp4".to_string(), "mkv".to_string(), "webm".to_string()],
            output_extension: "mp4".to_string(),
            crf: 28,
            probe_timeout: Duration::from_secs(10),
            extract_timeout: Duration::from_secs(600),
        }
    }

    /// Load a configuration from a YAML file.
    ///
    /// Every key is optional; missing keys keep their defaults. Unknown keys
    /// are rejected so typos do not silently fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ClipError::ConfigurationFile`] if the file cannot be read
    /// or parsed.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ClipError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|error| ClipError::ConfigurationFile {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        Self::from_yaml_str(&text).map_err(|error| match error {
            ClipError::ConfigurationFile { reason, .. } => ClipError::ConfigurationFile {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a configuration from YAML text. See
    /// [`from_yaml_file`](PipelineConfig::from_yaml_file).
    pub fn from_yaml_str(text: &str) -> Result<Self, ClipError> {
        let file: ConfigFile =
            serde_yaml::from_str(text).map_err(|error| ClipError::ConfigurationFile {
                path: PathBuf::new(),
                reason: error.to_string(),
            })?;
        Ok(file.apply(Self::new()))
    }

    /// Set the clustering parameters.
    #[must_use]
    pub fn with_cluster_options(mut self, options: ClusterOptions) -> Self {
        self.cluster = options;
        self
    }

    /// Set the sliding-window parameters.
    #[must_use]
    pub fn with_window_options(mut self, options: WindowOptions) -> Self {
        self.windows = options;
        self
    }

    /// Select the extraction strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ExtractionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Directory that holds the full-length source assets.
    #[must_use]
    pub fn with_source_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.source_dir = dir.into();
        self
    }

    /// Directory that receives extracted clips.
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Number of extraction workers.
    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Source extensions to try, in order. Leading dots are stripped.
    #[must_use]
    pub fn with_source_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.source_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Extension (and therefore container) of written clips.
    #[must_use]
    pub fn with_output_extension(mut self, extension: &str) -> Self {
        self.output_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Constant rate factor for frame-accurate re-encoding (0–51).
    #[must_use]
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf;
        self
    }

    /// Upper bound on a single validity probe.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Upper bound on a single stream-copy invocation.
    #[must_use]
    pub fn with_extract_timeout(mut self, timeout: Duration) -> Self {
        self.extract_timeout = timeout;
        self
    }

    pub fn cluster(&self) -> &ClusterOptions {
        &self.cluster
    }

    pub fn windows(&self) -> &WindowOptions {
        &self.windows
    }

    pub fn strategy(&self) -> ExtractionStrategy {
        self.strategy
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn source_extensions(&self) -> &[String] {
        &self.source_extensions
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    pub fn crf(&self) -> u32 {
        self.crf
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub fn extract_timeout(&self) -> Duration {
        self.extract_timeout
    }

    /// Check every option for range and consistency.
    ///
    /// Directory existence is checked separately by the entry points that
    /// need it, since planning does not touch the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ClipError::InvalidConfiguration`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ClipError> {
        let invalid = |message: String| Err(ClipError::InvalidConfiguration(message));
        let cluster = &self.cluster;

        if !(cluster.window.is_finite() && cluster.window > 0.0) {
            return invalid(format!("window must be positive, got {}", cluster.window));
        }
        if !(cluster.buffer.is_finite() && cluster.buffer >= 0.0) {
            return invalid(format!("buffer must be non-negative, got {}", cluster.buffer));
        }
        if cluster.min_duration == 0 {
            return invalid("min_duration must be greater than zero".to_string());
        }
        if cluster.min_duration > cluster.max_duration {
            return invalid(format!(
                "min_duration ({}) exceeds max_duration ({})",
                cluster.min_duration, cluster.max_duration,
            ));
        }
        if self.windows.window_size == 0 {
            return invalid("window_size must be greater than zero".to_string());
        }
        if self.windows.stride == 0 {
            return invalid("stride must be greater than zero".to_string());
        }
        if self.worker_count == 0 {
            return invalid("worker_count must be greater than zero".to_string());
        }
        if self.source_extensions.is_empty()
            || self.source_extensions.iter().any(|ext| ext.is_empty())
        {
            return invalid("source_extensions must list at least one extension".to_string());
        }
        if self.output_extension.is_empty() {
            return invalid("output_extension must not be empty".to_string());
        }
        if self.crf > 51 {
            return invalid(format!("crf must be within 0-51, got {}", self.crf));
        }
        Ok(())
    }
}

/// On-disk shape of a YAML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    window: Option<f64>,
    min_duration: Option<u32>,
    max_duration: Option<u32>,
    buffer: Option<f64>,
    window_size: Option<u32>,
    stride: Option<u32>,
    strategy: Option<ExtractionStrategy>,
    source_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    worker_count: Option<usize>,
    source_extensions: Option<Vec<String>>,
    output_extension: Option<String>,
    crf: Option<u32>,
    probe_timeout_secs: Option<u64>,
    extract_timeout_secs: Option<u64>,
}

impl ConfigFile {
    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        let cluster = &mut config.cluster;
        if let Some(window) = self.window {
            cluster.window = window;
        }
        if let Some(min_duration) = self.min_duration {
            cluster.min_duration = min_duration;
        }
        if let Some(max_duration) = self.max_duration {
            cluster.max_duration = max_duration;
        }
        if let Some(buffer) = self.buffer {
            cluster.buffer = buffer;
        }
        if let Some(window_size) = self.window_size {
            config.windows.window_size = window_size;
        }
        if let Some(stride) = self.stride {
            config.windows.stride = stride;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(dir) = self.source_dir {
            config.source_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(count) = self.worker_count {
            config.worker_count = count;
        }
        if let Some(extensions) = self.source_extensions {
            config = config.with_source_extensions(extensions);
        }
        if let Some(extension) = self.output_extension {
            config = config.with_output_extension(&extension);
        }
        if let Some(crf) = self.crf {
            config.crf = crf;
        }
        if let Some(secs) = self.probe_timeout_secs {
            config.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.extract_timeout_secs {
            config.extract_timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count(), 8);
        assert_eq!(config.source_extensions(), ["mp4", "mkv", "webm"]);
        assert_eq!(config.strategy(), ExtractionStrategy::FrameAccurate);
    }

    #[test]
    fn rejects_inverted_duration_bounds() {
        let config = PipelineConfig::new().with_cluster_options(ClusterOptions {
            min_duration: 20,
            max_duration: 10,
            ..ClusterOptions::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ClipError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_zero_stride() {
        let config = PipelineConfig::new().with_window_options(WindowOptions {
            window_size: 15,
            stride: 0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_nan_window() {
        let config = PipelineConfig::new().with_cluster_options(ClusterOptions {
            window: f64::NAN,
            ..ClusterOptions::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn extensions_lose_leading_dot() {
        let config = PipelineConfig::new()
            .with_source_extensions([".mov", "avi"])
            .with_output_extension(".mkv");
        assert_eq!(config.source_extensions(), ["mov", "avi"]);
        assert_eq!(config.output_extension(), "mkv");
    }

    #[test]
    fn strategy_parses_aliases() {
        assert_eq!(
            "copy".parse::<ExtractionStrategy>().unwrap(),
            ExtractionStrategy::StreamCopy
        );
        assert_eq!(
            "Frame-Accurate".parse::<ExtractionStrategy>().unwrap(),
            ExtractionStrategy::FrameAccurate
        );
        assert!("gpu".parse::<ExtractionStrategy>().is_err());
    }

    #[test]
    fn yaml_overrides_only_given_keys() {
        let config = PipelineConfig::from_yaml_str(
            "window: 3.5\nmax_duration: 20\nstrategy: stream-copy\nsource_extensions: [\".mkv\"]\n",
        )
        .unwrap();
        assert_eq!(config.cluster().window, 3.5);
        assert_eq!(config.cluster().max_duration, 20);
        assert_eq!(config.cluster().min_duration, 7);
        assert_eq!(config.strategy(), ExtractionStrategy::StreamCopy);
        assert_eq!(config.source_extensions(), ["mkv"]);
    }

    #[test]
    fn yaml_rejects_unknown_keys() {
        let result = PipelineConfig::from_yaml_str("windw: 3\n");
        assert!(matches!(result, Err(ClipError::ConfigurationFile { .. })));
    }
}
