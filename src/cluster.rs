//! Temporal clustering of sparse event timestamps.
//!
//! Timestamps closer together than the configured window are linked into a
//! single cluster, and each cluster becomes one clip. The clip is centered
//! on the most frequent timestamp when one repeats, and on the median
//! otherwise. Its length is the cluster span plus a buffer, clamped to the
//! configured bounds.
//!
//! # Example
//!
//! ```
//! use clipsampler::{ClusterOptions, cluster_timestamps};
//!
//! let windows = cluster_timestamps(&[10.0, 12.0, 13.0], &ClusterOptions::default());
//! assert_eq!(windows.len(), 1);
//! assert_eq!(windows[0].center, 12);
//! assert_eq!(windows[0].duration, 7);
//! ```

use crate::annotation::VideoEvents;
use crate::clip::{ClipSpec, ClipWindow};
use crate::configuration::ClusterOptions;

/// Split an ascending sequence into runs whose consecutive gaps are all
/// strictly smaller than `window`.
///
/// Membership is decided against the previous value, so a long chain of
/// close events stays in one cluster even if its overall span exceeds
/// `window`. Equal values always share a run.
pub fn split_into_clusters(sorted: &[f64], window: f64) -> Vec<&[f64]> {
    let mut clusters = Vec::new();
    let mut start = 0;

    for index in 1..sorted.len() {
        if sorted[index] - sorted[index - 1] >= window {
            clusters.push(&sorted[start..index]);
            start = index;
        }
    }
    if start < sorted.len() {
        clusters.push(&sorted[start..]);
    }

    clusters
}

/// Cluster one video's timestamps into clip windows.
///
/// The input may be unsorted and contain duplicates; duplicates count
/// toward the mode. Output is ordered by cluster start time and is fully
/// determined by the multiset of input values.
pub fn cluster_timestamps(timestamps: &[f64], options: &ClusterOptions) -> Vec<ClipWindow> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_by(f64::total_cmp);

    split_into_clusters(&sorted, options.window)
        .into_iter()
        .map(|members| ClipWindow {
            center: cluster_center(members),
            duration: cluster_duration(members, options),
        })
        .collect()
}

/// Cluster every video's events into clip specs, video by video in the
/// order the groups are given.
pub fn plan_clusters(groups: &[VideoEvents], options: &ClusterOptions) -> Vec<ClipSpec> {
    groups
        .iter()
        .flat_map(|group| {
            cluster_timestamps(&group.timestamps, options)
                .into_iter()
                .map(|window| ClipSpec::from_window(group.video_id.clone(), window))
        })
        .collect()
}

/// Mode if some value occurs more than once (smallest wins ties), median
/// otherwise. Truncated to whole seconds.
fn cluster_center(members: &[f64]) -> u64 {
    match mode(members) {
        Some(value) => value as u64,
        None => median(members) as u64,
    }
}

fn mode(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut index = 0;

    while index < sorted.len() {
        let value = sorted[index];
        let run = sorted[index..].iter().take_while(|&&other| other == value).count();
        // Strictly greater, so the earliest (smallest) value keeps a tie.
        if run > 1 && best.is_none_or(|(_, count)| run > count) {
            best = Some((value, run));
        }
        index += run;
    }

    best.map(|(value, _)| value)
}

fn median(sorted: &[f64]) -> f64 {
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

// Unlike `f64::clamp`, never panics on inverted bounds; the minimum wins.
fn cluster_duration(members: &[f64], options: &ClusterOptions) -> u32 {
    let span = members[members.len() - 1] - members[0];
    let bounded = (span + options.buffer)
        .min(f64::from(options.max_duration))
        .max(f64::from(options.min_duration));
    bounded as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ClusterOptions {
        ClusterOptions::default()
    }

    fn pairs(windows: &[ClipWindow]) -> Vec<(u64, u32)> {
        windows.iter().map(|w| (w.center, w.duration)).collect()
    }

    // ── Linkage ────────────────────────────────────────────────────

    #[test]
    fn close_events_form_one_cluster() {
        let windows = cluster_timestamps(&[10.0, 12.0, 13.0], &defaults());
        assert_eq!(pairs(&windows), [(12, 7)]);
    }

    #[test]
    fn distant_event_starts_new_cluster() {
        let windows = cluster_timestamps(&[1.0, 2.0, 20.0], &defaults());
        // Median of [1, 2] is 1.5, truncated to 1.
        assert_eq!(pairs(&windows), [(1, 7), (20, 7)]);
    }

    #[test]
    fn gap_equal_to_window_splits() {
        let windows = cluster_timestamps(&[0.0, 5.0], &defaults());
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn chained_events_stay_linked() {
        let timestamps: Vec<f64> = (0..10i32).map(|i| f64::from(i) * 4.0).collect();
        let windows = cluster_timestamps(&timestamps, &defaults());
        assert_eq!(windows.len(), 1);
        // Span 36 + buffer 1 exceeds the upper bound.
        assert_eq!(windows[0].duration, 15);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(cluster_timestamps(&[], &defaults()).is_empty());
    }

    // ── Center ─────────────────────────────────────────────────────

    #[test]
    fn repeated_value_wins_over_median() {
        let windows = cluster_timestamps(&[10.0, 11.0, 11.0, 14.0], &defaults());
        assert_eq!(windows[0].center, 11);
    }

    #[test]
    fn mode_tie_prefers_smallest_value() {
        let windows = cluster_timestamps(&[13.0, 12.0, 13.0, 12.0, 14.0], &defaults());
        assert_eq!(windows[0].center, 12);
    }

    #[test]
    fn even_count_median_is_mean_of_middles() {
        let windows = cluster_timestamps(&[10.0, 11.0, 14.0, 15.0], &defaults());
        // (11 + 14) / 2 = 12.5, truncated.
        assert_eq!(windows[0].center, 12);
    }

    #[test]
    fn plan_keeps_video_order() {
        let groups = [
            VideoEvents {
                video_id: "b".to_string(),
                timestamps: vec![40.0, 10.0],
            },
            VideoEvents {
                video_id: "a".to_string(),
                timestamps: vec![10.0, 12.0, 13.0],
            },
        ];
        let specs = plan_clusters(&groups, &defaults());
        assert_eq!(
            specs,
            [
                ClipSpec::new("b", 10, 7),
                ClipSpec::new("b", 40, 7),
                ClipSpec::new("a", 12, 7),
            ]
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = cluster_timestamps(&[3.0, 30.0, 1.0, 2.0, 31.0, 2.0], &defaults());
        let b = cluster_timestamps(&[2.0, 31.0, 2.0, 1.0, 30.0, 3.0], &defaults());
        assert_eq!(a, b);
    }

    // ── Duration ───────────────────────────────────────────────────

    #[test]
    fn duration_always_within_bounds() {
        let options = ClusterOptions {
            window: 3.0,
            min_duration: 4,
            max_duration: 9,
            buffer: 0.5,
        };
        let timestamps: Vec<f64> = (0..200i32).map(|i| f64::from(i * 37 % 101) * 0.7).collect();
        for window in cluster_timestamps(&timestamps, &options) {
            assert!((4..=9).contains(&window.duration), "{window:?}");
        }
    }

    #[test]
    fn inverted_bounds_fall_back_to_minimum() {
        let options = ClusterOptions {
            min_duration: 20,
            max_duration: 10,
            ..ClusterOptions::default()
        };
        let windows = cluster_timestamps(&[100.0, 103.0, 140.0], &options);
        assert!(!windows.is_empty());
        for window in &windows {
            assert_eq!(window.duration, 20, "{window:?}");
        }
    }

    #[test]
    fn span_plus_buffer_is_truncated() {
        let options = ClusterOptions {
            min_duration: 1,
            ..ClusterOptions::default()
        };
        let windows = cluster_timestamps(&[0.0, 2.0, 4.5, 8.9], &options);
        // 8.9 + 1.0 = 9.9 seconds.
        assert_eq!(windows[0].duration, 9);
    }
}
