//! Annotation source parsing.
//!
//! The clustering path consumes a headerless CSV whose rows start with
//! `video_id,timestamp`. Any further columns (boxes, action labels, person
//! ids in AVA-style files) are ignored. Rows are grouped per video in the
//! order each video is first seen, which keeps task enumeration stable
//! across runs.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::error::ClipError;

/// A single annotated instant in a video.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Identifier of the source video (the file stem of its asset).
    pub video_id: String,
    /// Event time in seconds from the start of the video.
    pub timestamp: f64,
}

/// All raw timestamps of one video, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEvents {
    pub video_id: String,
    pub timestamps: Vec<f64>,
}

/// Read every event from an annotation CSV on disk.
///
/// # Errors
///
/// - [`ClipError::AnnotationRead`] if the file cannot be opened.
/// - [`ClipError::AnnotationParse`] on the first malformed row.
pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<Vec<RawEvent>, ClipError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|error| ClipError::AnnotationRead {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    parse_annotations(file, path)
}

/// Parse events from any reader. `source` is only used in error messages.
pub fn parse_annotations<R: Read>(reader: R, source: &Path) -> Result<Vec<RawEvent>, ClipError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut events = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|error| {
            let line = error.position().map_or(0, |position| position.line());
            ClipError::AnnotationParse {
                path: source.to_path_buf(),
                line,
                reason: error.to_string(),
            }
        })?;
        let line = record.position().map_or(0, |position| position.line());
        let parse_error = |reason: String| ClipError::AnnotationParse {
            path: source.to_path_buf(),
            line,
            reason,
        };

        let video_id = match record.get(0) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(parse_error("missing video id".to_string())),
        };
        let raw_timestamp = record
            .get(1)
            .ok_or_else(|| parse_error("missing timestamp column".to_string()))?;
        let timestamp: f64 = raw_timestamp
            .parse()
            .map_err(|_| parse_error(format!("timestamp is not a number: {raw_timestamp:?}")))?;
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(parse_error(format!(
                "timestamp must be a finite, non-negative number of seconds: {timestamp}"
            )));
        }

        events.push(RawEvent {
            video_id,
            timestamp,
        });
    }

    log::debug!("Parsed {} annotation events from {}", events.len(), source.display());
    Ok(events)
}

/// Group events by video id, keeping first-seen video order and the
/// original timestamp order within each video.
pub fn group_by_video(events: &[RawEvent]) -> Vec<VideoEvents> {
    let mut groups: Vec<VideoEvents> = Vec::new();
    let mut index_of: HashMap<&str, usize> = HashMap::new();

    for event in events {
        let index = *index_of.entry(event.video_id.as_str()).or_insert_with(|| {
            groups.push(VideoEvents {
                video_id: event.video_id.clone(),
                timestamps: Vec::new(),
            });
            groups.len() - 1
        });
        groups[index].timestamps.push(event.timestamp);
    }

    groups
}

/// Read a relevance filter: one video id per line.
///
/// Blank lines and lines starting with `#` are ignored. A trailing file
/// extension is not stripped; ids must match asset stems exactly.
///
/// # Errors
///
/// Returns [`ClipError::AnnotationRead`] if the file cannot be read.
pub fn read_video_ids<P: AsRef<Path>>(path: P) -> Result<HashSet<String>, ClipError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|error| ClipError::AnnotationRead {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<RawEvent>, ClipError> {
        parse_annotations(text.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn reads_first_two_columns_only() {
        let events =
            parse("-5KQ66BBWC4,0902,0.077,0.151,0.283,0.811,80,1\n-5KQ66BBWC4,0903,0.1,0.2,0.3,0.4,9,1\n")
                .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].video_id, "-5KQ66BBWC4");
        assert_eq!(events[0].timestamp, 902.0);
        assert_eq!(events[1].timestamp, 903.0);
    }

    #[test]
    fn rejects_non_numeric_timestamp_with_line_number() {
        let error = parse("v1,10\nv1,ten\n").unwrap_err();
        match error {
            ClipError::AnnotationParse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected AnnotationParse, got {other}"),
        }
    }

    #[test]
    fn rejects_rows_without_timestamp() {
        assert!(matches!(
            parse("v1\n"),
            Err(ClipError::AnnotationParse { .. })
        ));
    }

    #[test]
    fn rejects_negative_timestamp() {
        assert!(parse("v1,-3.0\n").is_err());
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let events = parse("b,1\na,2\nb,3\nc,4\na,5\n").unwrap();
        let groups = group_by_video(&events);
        let ids: Vec<&str> = groups.iter().map(|g| g.video_id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
        assert_eq!(groups[0].timestamps, [1.0, 3.0]);
        assert_eq!(groups[1].timestamps, [2.0, 5.0]);
    }
}
