//! Media file probing.
//!
//! Two independent probes live here:
//!
//! - [`Prober`] answers a single question, "is this file a usable clip?",
//!   by asking the `ffprobe` tool for the frame count of the first video
//!   stream (or its packet count, for containers such as Matroska that do
//!   not record one). It never fails: every problem (missing tool, non-zero
//!   exit, unparsable output, timeout) simply means "not valid". The pool
//!   uses it as its idempotency gate and to catch corrupt output.
//! - [`MediaProbe`] opens a file with FFmpeg's libraries and returns
//!   [`MediaMetadata`]. The sliding-window generator reads durations from
//!   it and the output checker inspects the video stream.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use ffmpeg_next::{codec::context::Context as CodecContext, media::Type};

use crate::command::run_with_timeout;
use crate::error::ClipError;
use crate::metadata::{MediaMetadata, VideoMetadata};

/// Decides whether a file on disk is a valid, non-empty video.
pub trait Prober: Send + Sync {
    fn is_valid(&self, path: &Path) -> bool;
}

/// [`Prober`] backed by `ffprobe`'s declared frame count.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use std::time::Duration;
/// use clipsampler::{FfprobeProber, Prober};
///
/// let prober = FfprobeProber::new(Duration::from_secs(10));
/// if !prober.is_valid(Path::new("clips/v1_12s_7s.mp4")) {
///     println!("needs re-extraction");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: String,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "ffprobe".to_string(),
            timeout,
        }
    }

    /// Use a different `ffprobe` binary (e.g. an absolute path).
    #[must_use]
    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    /// Frame count of the first video stream.
    ///
    /// The header's `nb_frames` is used when present. Matroska and WebM do
    /// not store it, so the demuxed packet count is the fallback.
    pub fn frame_count(&self, path: &Path) -> Result<u64, ClipError> {
        let output = run_with_timeout(
            &self.program,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-count_packets"),
                OsStr::new("-select_streams"),
                OsStr::new("v:0"),
                OsStr::new("-show_entries"),
                OsStr::new("stream=nb_frames,nb_read_packets"),
                OsStr::new("-of"),
                OsStr::new("default=nokey=1:noprint_wrappers=1"),
                path.as_os_str(),
            ],
            self.timeout,
        )?
        .into_success(&self.program)?;

        parse_frame_count(&output.stdout).ok_or_else(|| ClipError::ExternalTool {
            program: self.program.clone(),
            status: output.status.to_string(),
            stderr: format!("unexpected frame count output: {:?}", output.stdout.trim()),
        })
    }
}

impl Prober for FfprobeProber {
    fn is_valid(&self, path: &Path) -> bool {
        match self.frame_count(path) {
            Ok(frames) => {
                log::debug!("{} has {frames} frames", path.display());
                frames > 0
            }
            Err(error) => {
                log::debug!("Probe of {} failed: {error}", path.display());
                false
            }
        }
    }
}

/// First usable count in `ffprobe` output: `nb_frames`, then
/// `nb_read_packets`. Either may be `N/A`.
fn parse_frame_count(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| line.parse::<i64>().ok().and_then(|count| u64::try_from(count).ok()))
}

/// Lightweight metadata probe using FFmpeg's libraries.
///
/// Opens the file, reads the container and its best video stream, and
/// closes the demuxer again.
///
/// # Example
///
/// ```no_run
/// use clipsampler::MediaProbe;
///
/// let metadata = MediaProbe::probe("videos/-5KQ66BBWC4.mkv")?;
/// println!("Duration: {:?}, format: {}", metadata.duration, metadata.format);
/// if let Some(video) = &metadata.video {
///     println!("Video: {}x{} @ {} fps", video.width, video.height, video.frames_per_second);
/// }
/// # Ok::<(), clipsampler::ClipError>(())
/// ```
pub struct MediaProbe;

impl MediaProbe {
    /// Probe a media file and return its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ClipError::FileOpen`] if the file cannot be opened or
    /// recognised as a media file.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaMetadata, ClipError> {
        let path = path.as_ref();
        log::debug!("Probing media file: {}", path.display());

        let open_error = |reason: String| ClipError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        let input = ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let duration_microseconds = input.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };
        let format = input.format().name().to_string();

        let video = match input.streams().best(Type::Video) {
            Some(stream) => {
                let decoder = CodecContext::from_parameters(stream.parameters())
                    .and_then(|context| context.decoder().video())
                    .map_err(|error| {
                        open_error(format!("Failed to read video codec parameters: {error}"))
                    })?;

                let frames_per_second = rational_to_f64(stream.avg_frame_rate())
                    .or_else(|| rational_to_f64(stream.rate()))
                    .unwrap_or(0.0);
                let frame_count = if stream.frames() > 0 {
                    stream.frames() as u64
                } else if frames_per_second > 0.0 {
                    (duration.as_secs_f64() * frames_per_second) as u64
                } else {
                    0
                };
                let codec = decoder
                    .codec()
                    .map(|codec| codec.name().to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                Some(VideoMetadata {
                    width: decoder.width(),
                    height: decoder.height(),
                    frames_per_second,
                    frame_count,
                    codec,
                })
            }
            None => None,
        };

        log::debug!(
            "Probed {} (format={}, duration={:.2}s, video={})",
            path.display(),
            format,
            duration.as_secs_f64(),
            video.is_some(),
        );

        Ok(MediaMetadata {
            video,
            duration,
            format,
        })
    }
}

fn rational_to_f64(rational: ffmpeg_next::Rational) -> Option<f64> {
    if rational.denominator() != 0 && rational.numerator() > 0 {
        Some(f64::from(rational.numerator()) / f64::from(rational.denominator()))
    } else {
        None
    }
}

/// Reads the declared duration of a source asset.
///
/// The sliding-window generator takes this as a parameter so its scan can
/// be exercised without real media.
pub trait DurationProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64, ClipError>;
}

impl DurationProbe for MediaProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64, ClipError> {
        Ok(MediaProbe::probe(path)?.duration.as_secs_f64())
    }
}
