//! Task planning entry points.
//!
//! Both sampling modes end in the same place: a deduplicated [`TaskList`]
//! ready for the [`WorkerPool`](crate::WorkerPool). Planning never touches
//! the output directory, so it can also be used on its own to preview a
//! run.

use std::path::Path;

use crate::annotation::{group_by_video, read_annotations, read_video_ids};
use crate::clip::TaskList;
use crate::cluster::plan_clusters;
use crate::configuration::PipelineConfig;
use crate::error::ClipError;
use crate::probe::DurationProbe;
use crate::window::plan_windows;

/// Cluster the events of an annotation CSV into unique clip specs.
///
/// # Errors
///
/// Fails on invalid configuration or an unreadable or malformed
/// annotation file.
pub fn plan_from_annotations<P: AsRef<Path>>(
    annotations: P,
    config: &PipelineConfig,
) -> Result<TaskList, ClipError> {
    config.validate()?;
    let events = read_annotations(annotations)?;
    let groups = group_by_video(&events);
    let specs = plan_clusters(&groups, config.cluster());
    let tasks: TaskList = specs.into_iter().collect();
    log::info!(
        "Planned {} clips from {} events across {} videos",
        tasks.len(),
        events.len(),
        groups.len()
    );
    Ok(tasks)
}

/// Cut every eligible source asset into sliding windows.
///
/// `filter` is a file of video ids, one per line. Without it every asset in
/// the source directory is used.
///
/// # Errors
///
/// Fails on invalid configuration, an unreadable filter file, or a missing
/// source directory.
pub fn plan_from_windows<D: DurationProbe>(
    filter: Option<&Path>,
    config: &PipelineConfig,
    probe: &D,
) -> Result<TaskList, ClipError> {
    config.validate()?;
    let filter = filter.map(read_video_ids).transpose()?;
    let specs = plan_windows(config, filter.as_ref(), probe)?;
    let tasks: TaskList = specs.into_iter().collect();
    log::info!("Planned {} window clips", tasks.len());
    Ok(tasks)
}
