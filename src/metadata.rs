//! Media metadata types.
//!
//! Returned by [`MediaProbe::probe`](crate::MediaProbe::probe). The
//! sliding-window generator only needs [`MediaMetadata::duration`]; the
//! output checker inspects the video stream fields.

use std::time::Duration;

use serde::Serialize;

/// Container-level metadata plus the best video stream, if any.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct MediaMetadata {
    /// Video stream metadata, if a video stream is present.
    pub video: Option<VideoMetadata>,
    /// Declared duration of the container. Zero when unknown.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
}

/// Metadata for the best video stream of a file.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Average frame rate; zero when the container does not declare one.
    pub frames_per_second: f64,
    /// Frame count from the stream header, or estimated from duration and
    /// frame rate when the header has none.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
}
