//! Fixed-size sliding windows over whole videos.
//!
//! Used when no annotations exist: every eligible asset is cut into
//! back-to-back (or overlapping, with a stride below the window size)
//! windows covering its declared duration. A trailing remainder shorter
//! than one window is dropped.
//!
//! # Example
//!
//! ```
//! use clipsampler::{WindowOptions, sliding_windows};
//!
//! let windows = sliding_windows(900.0, &WindowOptions { window_size: 15, stride: 15 });
//! assert_eq!(windows.len(), 60);
//! assert_eq!(windows[0].center, 7);
//! assert_eq!(windows[59].center, 892);
//! ```

use std::collections::{BTreeSet, HashSet};
use std::fs;

use crate::clip::{ClipSpec, ClipWindow};
use crate::configuration::{PipelineConfig, WindowOptions};
use crate::error::ClipError;
use crate::probe::DurationProbe;
use crate::resolver::AssetResolver;

/// Windows of `options.window_size` seconds, every `options.stride`
/// seconds, that fit entirely inside `duration_secs`.
///
/// A zero size or stride yields no windows; [`PipelineConfig::validate`]
/// rejects both before this is reached.
pub fn sliding_windows(duration_secs: f64, options: &WindowOptions) -> Vec<ClipWindow> {
    let size = u64::from(options.window_size);
    let stride = u64::from(options.stride);
    if size == 0 || stride == 0 || !duration_secs.is_finite() {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut start = 0u64;
    while (start + size) as f64 <= duration_secs {
        windows.push(ClipWindow {
            center: start + size / 2,
            duration: options.window_size,
        });
        start += stride;
    }
    windows
}

/// Build window specs for every eligible asset in the source directory.
///
/// Assets are visited in video id order. When `filter` is given only ids
/// it contains are scanned. An asset whose duration cannot be read, or is
/// zero, is skipped with a warning.
///
/// # Errors
///
/// Returns [`ClipError::MissingSourceDirectory`] if the source directory
/// does not exist, or [`ClipError::IoError`] if it cannot be listed.
pub fn plan_windows<D: DurationProbe>(
    config: &PipelineConfig,
    filter: Option<&HashSet<String>>,
    probe: &D,
) -> Result<Vec<ClipSpec>, ClipError> {
    let resolver = AssetResolver::new(config);
    let video_ids = scan_video_ids(&resolver)?;

    let mut specs = Vec::new();
    for video_id in video_ids {
        if filter.is_some_and(|filter| !filter.contains(&video_id)) {
            continue;
        }
        // Resolve again so that extension precedence picks the asset.
        let Some(path) = resolver.resolve(&video_id) else {
            log::warn!(
                "Skipping {video_id}: no source file in {}",
                resolver.source_dir().display()
            );
            continue;
        };

        let duration = match probe.duration_seconds(&path) {
            Ok(duration) if duration > 0.0 => duration,
            Ok(_) => {
                log::warn!("Skipping {}: duration is zero or unknown", path.display());
                continue;
            }
            Err(error) => {
                log::warn!("Skipping {}: {error}", path.display());
                continue;
            }
        };

        let windows = sliding_windows(duration, config.windows());
        log::debug!(
            "{} ({:.1}s) yields {} windows",
            video_id,
            duration,
            windows.len()
        );
        specs.extend(
            windows
                .into_iter()
                .map(|window| ClipSpec::from_window(video_id.clone(), window)),
        );
    }

    Ok(specs)
}

fn scan_video_ids(resolver: &AssetResolver) -> Result<BTreeSet<String>, ClipError> {
    let source_dir = resolver.source_dir();
    if !source_dir.is_dir() {
        return Err(ClipError::MissingSourceDirectory(source_dir.to_path_buf()));
    }

    let mut ids = BTreeSet::new();
    for entry in fs::read_dir(source_dir)? {
        let path = entry?.path();
        if !path.is_file() || !resolver.is_source_file(&path) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            ids.insert(stem.to_string());
        }
    }
    Ok(ids)
}
