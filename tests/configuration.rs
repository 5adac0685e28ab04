//! PipelineConfig builder, YAML loading, and validation tests.

use std::fs;
use std::path::Path;
use std::time::Duration;

use clipsampler::{ClipError, ClusterOptions, ExtractionStrategy, PipelineConfig, WindowOptions};

// ── Builder ────────────────────────────────────────────────────────

#[test]
fn config_defaults() {
    let config = PipelineConfig::new();
    assert_eq!(*config.cluster(), ClusterOptions::default());
    assert_eq!(config.cluster().window, 5.0);
    assert_eq!(config.cluster().min_duration, 7);
    assert_eq!(config.cluster().max_duration, 15);
    assert_eq!(config.cluster().buffer, 1.0);
    assert_eq!(
        *config.windows(),
        WindowOptions {
            window_size: 15,
            stride: 15
        }
    );
    assert_eq!(config.output_extension(), "mp4");
    assert_eq!(config.crf(), 28);
    assert_eq!(config.probe_timeout(), Duration::from_secs(10));
}

#[test]
fn config_builder_chains() {
    let config = PipelineConfig::new()
        .with_source_dir("videos/trainval")
        .with_output_dir("sampled_clips")
        .with_strategy(ExtractionStrategy::StreamCopy)
        .with_worker_count(4)
        .with_crf(18)
        .with_extract_timeout(Duration::from_secs(30));

    assert_eq!(config.source_dir(), Path::new("videos/trainval"));
    assert_eq!(config.output_dir(), Path::new("sampled_clips"));
    assert_eq!(config.strategy(), ExtractionStrategy::StreamCopy);
    assert_eq!(config.worker_count(), 4);
    assert_eq!(config.crf(), 18);
    assert_eq!(config.extract_timeout(), Duration::from_secs(30));
    assert!(config.validate().is_ok());
}

#[test]
fn validation_names_the_bad_value() {
    let config = PipelineConfig::new().with_crf(60);
    let message = config.validate().unwrap_err().to_string();
    assert!(message.contains("crf"), "{message}");

    let config = PipelineConfig::new().with_worker_count(0);
    assert!(matches!(
        config.validate(),
        Err(ClipError::InvalidConfiguration(_))
    ));
}

#[test]
fn equal_duration_bounds_are_allowed() {
    let config = PipelineConfig::new().with_cluster_options(ClusterOptions {
        min_duration: 10,
        max_duration: 10,
        ..ClusterOptions::default()
    });
    assert!(config.validate().is_ok());
}

// ── YAML ───────────────────────────────────────────────────────────

#[test]
fn yaml_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clipsampler.yaml");
    fs::write(
        &path,
        "# sampling for the AVA train split\n\
         window: 3\n\
         min_duration: 5\n\
         max_duration: 10\n\
         window_size: 10\n\
         stride: 5\n\
         strategy: frame-accurate\n\
         source_dir: videos/trainval\n\
         output_dir: sampled_clips\n\
         worker_count: 16\n\
         output_extension: mkv\n\
         probe_timeout_secs: 5\n",
    )
    .unwrap();

    let config = PipelineConfig::from_yaml_file(&path).unwrap();

    assert_eq!(config.cluster().window, 3.0);
    assert_eq!(config.cluster().min_duration, 5);
    assert_eq!(config.cluster().max_duration, 10);
    assert_eq!(config.cluster().buffer, 1.0);
    assert_eq!(config.windows().stride, 5);
    assert_eq!(config.source_dir(), Path::new("videos/trainval"));
    assert_eq!(config.worker_count(), 16);
    assert_eq!(config.output_extension(), "mkv");
    assert_eq!(config.probe_timeout(), Duration::from_secs(5));
    assert!(config.validate().is_ok());
}

#[test]
fn empty_yaml_file_gives_defaults() {
    let config = PipelineConfig::from_yaml_str("").unwrap();
    assert_eq!(config.worker_count(), PipelineConfig::new().worker_count());
}

#[test]
fn yaml_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "strategy: teleport\n").unwrap();

    match PipelineConfig::from_yaml_file(&path) {
        Err(ClipError::ConfigurationFile { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected ConfigurationFile, got {other:?}"),
    }
}

#[test]
fn missing_yaml_file_is_an_error() {
    let result = PipelineConfig::from_yaml_file("does_not_exist.yaml");
    assert!(matches!(result, Err(ClipError::ConfigurationFile { .. })));
}

#[test]
fn yaml_values_are_still_validated() {
    let config = PipelineConfig::from_yaml_str("min_duration: 20\nmax_duration: 10\n").unwrap();
    assert!(config.validate().is_err());
}
