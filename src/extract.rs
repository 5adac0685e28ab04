//! Clip extraction strategies.
//!
//! An [`Extractor`] writes the `[start, start + duration]` section of a
//! source asset to a destination file. Two implementations exist:
//!
//! - [`FrameAccurateExtractor`] decodes with FFmpeg's libraries from the
//!   keyframe preceding `start` and re-encodes exactly the frames inside
//!   the window as H.264 (YUV 4:2:0). Clip boundaries land on the requested
//!   frames regardless of the source's keyframe spacing.
//! - [`StreamCopyExtractor`] hands the cut to the `ffmpeg` tool with
//!   `-c:v copy`. It is much faster but boundaries snap to keyframes.
//!
//! Audio is dropped by both.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use clipsampler::{Extractor, FrameAccurateExtractor};
//!
//! let extractor = FrameAccurateExtractor::new(28);
//! extractor.extract(
//!     Path::new("videos/-5KQ66BBWC4.mkv"),
//!     Path::new("clips/-5KQ66BBWC4_905s_7s.mp4"),
//!     901.5,
//!     7.0,
//! )?;
//! # Ok::<(), clipsampler::ClipError>(())
//! ```

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use ffmpeg_next::codec::Id;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::{Flags as FormatFlags, Pixel};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Dictionary, Packet, Rational, decoder, encoder};

use crate::command::run_with_timeout;
use crate::configuration::{ExtractionStrategy, PipelineConfig};
use crate::error::ClipError;

/// Cuts one clip out of a source asset.
pub trait Extractor: Send + Sync {
    /// Write `duration` seconds of `source`, starting at `start` seconds,
    /// to `destination`. A partially written destination is left for the
    /// caller to clean up.
    fn extract(
        &self,
        source: &Path,
        destination: &Path,
        start: f64,
        duration: f64,
    ) -> Result<(), ClipError>;
}

/// Build the extractor selected by `config`.
pub fn extractor_for(config: &PipelineConfig) -> Box<dyn Extractor> {
    match config.strategy() {
        ExtractionStrategy::FrameAccurate => Box::new(FrameAccurateExtractor::new(config.crf())),
        ExtractionStrategy::StreamCopy => {
            Box::new(StreamCopyExtractor::new(config.extract_timeout()))
        }
    }
}

// ── Frame-accurate re-encode ───────────────────────────────────────

/// Decode-and-re-encode extraction through `ffmpeg-next`.
#[derive(Debug, Clone)]
pub struct FrameAccurateExtractor {
    crf: u32,
}

impl FrameAccurateExtractor {
    /// `crf` is the constant rate factor handed to the encoder (0–51,
    /// lower is better quality).
    pub fn new(crf: u32) -> Self {
        Self { crf }
    }
}

impl Extractor for FrameAccurateExtractor {
    fn extract(
        &self,
        source: &Path,
        destination: &Path,
        start: f64,
        duration: f64,
    ) -> Result<(), ClipError> {
        let end = start + duration;
        if !(duration > 0.0) {
            return Err(ClipError::EmptyClip { start, end });
        }

        ffmpeg_next::init()?;
        let mut input =
            ffmpeg_next::format::input(&source).map_err(|error| ClipError::FileOpen {
                path: source.to_path_buf(),
                reason: error.to_string(),
            })?;

        let (stream_index, time_base, frame_rate, parameters) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or_else(|| ClipError::NoVideoStream(source.to_path_buf()))?;
            let frame_rate = [stream.avg_frame_rate(), stream.rate()]
                .into_iter()
                .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
                .unwrap_or_else(|| Rational::new(25, 1));
            (stream.index(), stream.time_base(), frame_rate, stream.parameters())
        };
        let mut decoder = CodecContext::from_parameters(parameters)?.decoder().video()?;

        // Seek in AV_TIME_BASE units: lands on the keyframe at or before start.
        let seek_target = (start * f64::from(ffmpeg_sys_next::AV_TIME_BASE)) as i64;
        if seek_target > 0 {
            input.seek(seek_target, ..seek_target)?;
        }

        log::info!(
            "Extracting [{start:.3}s, {end:.3}s] of {} to {} (crf={})",
            source.display(),
            destination.display(),
            self.crf,
        );

        let mut cut = FrameWindow {
            start,
            end,
            time_base,
            first_pts: None,
        };
        let mut writer: Option<ClipWriter> = None;
        let mut past_end = false;

        for (stream, packet) in input.packets() {
            if stream.index() != stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            past_end = self.receive_frames(
                &mut decoder,
                &mut cut,
                &mut writer,
                destination,
                frame_rate,
            )?;
            if past_end {
                break;
            }
        }

        if !past_end {
            decoder.send_eof()?;
            self.receive_frames(&mut decoder, &mut cut, &mut writer, destination, frame_rate)?;
        }

        match writer {
            Some(writer) => {
                let frames = writer.finish()?;
                log::debug!("Wrote {frames} frames to {}", destination.display());
                Ok(())
            }
            None => Err(ClipError::EmptyClip { start, end }),
        }
    }
}

impl FrameAccurateExtractor {
    /// Drain decoded frames into the writer. Returns `true` once a frame
    /// past the end of the window has been seen.
    fn receive_frames(
        &self,
        decoder: &mut decoder::Video,
        cut: &mut FrameWindow,
        writer: &mut Option<ClipWriter>,
        destination: &Path,
        frame_rate: Rational,
    ) -> Result<bool, ClipError> {
        let mut decoded = VideoFrame::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let Some(pts) = decoded.timestamp().or_else(|| decoded.pts()) else {
                continue;
            };
            let seconds = pts_to_seconds(pts, cut.time_base);
            if seconds < cut.start {
                continue;
            }
            if seconds > cut.end {
                return Ok(true);
            }

            let first_pts = *cut.first_pts.get_or_insert(pts);
            if writer.is_none() {
                *writer = Some(ClipWriter::create(
                    destination,
                    decoder,
                    cut.time_base,
                    frame_rate,
                    self.crf,
                )?);
            }
            if let Some(clip_writer) = writer {
                clip_writer.write(&decoded, pts - first_pts)?;
            }
        }
        Ok(false)
    }
}

/// Requested section of the source, in the source stream's time base.
struct FrameWindow {
    start: f64,
    end: f64,
    time_base: Rational,
    /// Presentation timestamp of the first written frame; output
    /// timestamps are rebased so the clip starts at zero.
    first_pts: Option<i64>,
}

fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator())
}

/// An open H.264 output file.
///
/// Created lazily on the first frame inside the window so that an empty
/// window never produces a file.
struct ClipWriter {
    output: Output,
    encoder: encoder::video::Encoder,
    scaler: ScalingContext,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    frames_written: u64,
}

impl ClipWriter {
    fn create(
        destination: &Path,
        decoder: &decoder::Video,
        time_base: Rational,
        frame_rate: Rational,
        crf: u32,
    ) -> Result<Self, ClipError> {
        let width = decoder.width();
        let height = decoder.height();

        let mut output = ffmpeg_next::format::output(&destination)
            .map_err(|e| ClipError::VideoEncodeError(format!("cannot open output: {e}")))?;
        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        // libx264 when FFmpeg was built with it, any H.264 encoder otherwise.
        let codec = ffmpeg_next::encoder::find_by_name("libx264")
            .or_else(|| ffmpeg_next::encoder::find(Id::H264))
            .ok_or_else(|| ClipError::VideoEncodeError("no H.264 encoder available".to_string()))?;
        let mut stream = output
            .add_stream(codec)
            .map_err(|e| ClipError::VideoEncodeError(format!("cannot add stream: {e}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.encoder().video())
            .map_err(|e| ClipError::VideoEncodeError(format!("cannot create encoder: {e}")))?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(frame_rate));

        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let mut options = Dictionary::new();
        options.set("crf", &crf.to_string());
        let encoder = encoder
            .open_as_with(codec, options)
            .map_err(|e| ClipError::VideoEncodeError(format!("cannot open encoder: {e}")))?;
        stream.set_parameters(&encoder);

        output
            .write_header()
            .map_err(|e| ClipError::VideoEncodeError(format!("cannot write header: {e}")))?;
        // The muxer may pick its own time base while writing the header.
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| ClipError::VideoEncodeError("output stream vanished".to_string()))?;

        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base: time_base,
            stream_time_base,
            frames_written: 0,
        })
    }

    fn write(&mut self, frame: &VideoFrame, pts: i64) -> Result<(), ClipError> {
        let mut converted = VideoFrame::empty();
        self.scaler.run(frame, &mut converted)?;
        converted.set_pts(Some(pts));

        self.encoder
            .send_frame(&converted)
            .map_err(|e| ClipError::VideoEncodeError(format!("send_frame failed: {e}")))?;
        self.write_packets()?;
        self.frames_written += 1;
        Ok(())
    }

    fn write_packets(&mut self) -> Result<(), ClipError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| ClipError::VideoEncodeError(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }

    /// Flush the encoder and close the file. Returns the frame count.
    fn finish(mut self) -> Result<u64, ClipError> {
        self.encoder
            .send_eof()
            .map_err(|e| ClipError::VideoEncodeError(format!("send_eof failed: {e}")))?;
        self.write_packets()?;
        self.output
            .write_trailer()
            .map_err(|e| ClipError::VideoEncodeError(format!("cannot write trailer: {e}")))?;
        Ok(self.frames_written)
    }
}

// ── Stream copy ────────────────────────────────────────────────────

/// Keyframe-aligned extraction through the `ffmpeg` tool.
#[derive(Debug, Clone)]
pub struct StreamCopyExtractor {
    program: String,
    timeout: Duration,
}

impl StreamCopyExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "ffmpeg".to_string(),
            timeout,
        }
    }

    /// Use a different `ffmpeg` binary (e.g. an absolute path).
    #[must_use]
    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }
}

impl Extractor for StreamCopyExtractor {
    fn extract(
        &self,
        source: &Path,
        destination: &Path,
        start: f64,
        duration: f64,
    ) -> Result<(), ClipError> {
        log::info!(
            "Copying [{start:.3}s, +{duration:.3}s] of {} to {}",
            source.display(),
            destination.display(),
        );

        let start = format!("{start:.3}");
        let duration = format!("{duration:.3}");
        run_with_timeout(
            &self.program,
            [
                OsStr::new("-y"),
                OsStr::new("-hide_banner"),
                OsStr::new("-loglevel"),
                OsStr::new("error"),
                OsStr::new("-ss"),
                OsStr::new(&start),
                OsStr::new("-t"),
                OsStr::new(&duration),
                OsStr::new("-i"),
                source.as_os_str(),
                OsStr::new("-c:v"),
                OsStr::new("copy"),
                OsStr::new("-an"),
                destination.as_os_str(),
            ],
            self.timeout,
        )?
        .into_success(&self.program)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_selects_extractor() {
        // Only checks construction; extraction itself needs media fixtures.
        let config = PipelineConfig::new().with_strategy(ExtractionStrategy::StreamCopy);
        let _extractor = extractor_for(&config);
        let _extractor = extractor_for(&PipelineConfig::new());
    }

    #[test]
    fn empty_window_is_rejected_before_opening() {
        let result = FrameAccurateExtractor::new(28).extract(
            Path::new("missing.mp4"),
            Path::new("out.mp4"),
            3.0,
            0.0,
        );
        assert!(matches!(result, Err(ClipError::EmptyClip { .. })));
    }

    #[test]
    fn unreadable_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.mp4");
        let result = FrameAccurateExtractor::new(28).extract(
            &dir.path().join("missing.mp4"),
            &destination,
            0.0,
            7.0,
        );
        assert!(matches!(result, Err(ClipError::FileOpen { .. })));
        assert!(!destination.exists());
    }

    #[test]
    fn stream_copy_reports_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = StreamCopyExtractor::new(Duration::from_secs(1))
            .with_program("clipsampler-no-such-ffmpeg");
        let result = extractor.extract(
            &dir.path().join("in.mp4"),
            &dir.path().join("out.mp4"),
            0.0,
            7.0,
        );
        assert!(matches!(result, Err(ClipError::IoError(_))));
    }

    #[test]
    fn pts_conversion() {
        assert_eq!(pts_to_seconds(90_000, Rational::new(1, 90_000)), 1.0);
        assert_eq!(pts_to_seconds(1_001, Rational::new(1, 30_000)), 1_001.0 / 30_000.0);
    }
}
