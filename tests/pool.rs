//! Worker pool integration tests.
//!
//! These run against fake probe and extraction capabilities, so they need
//! neither FFmpeg tools nor fixture files.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use clipsampler::{
    CancellationToken, ClipError, ClipSpec, ExtractionOutcome, Extractor, PipelineConfig,
    ProgressCallback, ProgressInfo, Prober, WorkerPool,
};
use tempfile::TempDir;

const GOOD: &[u8] = b"good clip";

/// A file is valid when it holds exactly [`GOOD`].
struct ContentProber;

impl Prober for ContentProber {
    fn is_valid(&self, path: &Path) -> bool {
        fs::read(path).is_ok_and(|content| content == GOOD)
    }
}

#[derive(Clone, Copy)]
enum Behavior {
    Good,
    Slow,
    Corrupt,
    PartialThenFail,
    Panic,
    PartialThenPanic,
}

struct FakeExtractor {
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl FakeExtractor {
    fn new(behavior: Behavior) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                behavior,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl Extractor for FakeExtractor {
    fn extract(
        &self,
        _source: &Path,
        destination: &Path,
        _start: f64,
        _duration: f64,
    ) -> Result<(), ClipError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Good => fs::write(destination, GOOD)?,
            Behavior::Slow => {
                thread::sleep(Duration::from_millis(50));
                fs::write(destination, GOOD)?;
            }
            Behavior::Corrupt => fs::write(destination, b"truncated")?,
            Behavior::PartialThenFail => {
                fs::write(destination, b"half")?;
                return Err(ClipError::VideoEncodeError("encoder exploded".to_string()));
            }
            Behavior::Panic => panic!("decoder bug"),
            Behavior::PartialThenPanic => {
                fs::write(destination, b"half")?;
                panic!("scaler bug");
            }
        }
        Ok(())
    }
}

struct Workspace {
    _root: TempDir,
    config: PipelineConfig,
}

fn workspace(videos: &[&str]) -> Workspace {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("videos");
    fs::create_dir(&source).unwrap();
    for video in videos {
        fs::write(source.join(video), b"source").unwrap();
    }
    let config = PipelineConfig::new()
        .with_source_dir(source)
        .with_output_dir(root.path().join("clips"))
        .with_worker_count(3);
    Workspace {
        _root: root,
        config,
    }
}

fn pool(config: &PipelineConfig, behavior: Behavior) -> (WorkerPool, Arc<AtomicUsize>) {
    let (extractor, calls) = FakeExtractor::new(behavior);
    (
        WorkerPool::new(config, Box::new(ContentProber), Box::new(extractor)),
        calls,
    )
}

fn specs() -> Vec<ClipSpec> {
    vec![
        ClipSpec::new("alpha", 905, 7),
        ClipSpec::new("alpha", 1010, 15),
        ClipSpec::new("beta", 30, 7),
        ClipSpec::new("gamma", 2, 9),
    ]
}

#[test]
fn second_run_skips_everything() {
    let ws = workspace(&["alpha.mp4", "beta.mkv", "gamma.webm"]);

    let (first, first_calls) = pool(&ws.config, Behavior::Good);
    let run = first.run(&specs()).unwrap();
    assert_eq!(run.summary.extracted, 4);
    assert_eq!(first_calls.load(Ordering::SeqCst), 4);
    assert!(ws.config.output_dir().join("alpha_905s_7s.mp4").is_file());
    assert!(ws.config.output_dir().join("gamma_2s_9s.mp4").is_file());

    let (second, second_calls) = pool(&ws.config, Behavior::Good);
    let rerun = second.run(&specs()).unwrap();
    assert_eq!(rerun.summary.skipped, 4);
    assert_eq!(rerun.summary.extracted, 0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn invalid_existing_clip_is_redone() {
    let ws = workspace(&["alpha.mp4"]);
    fs::create_dir_all(ws.config.output_dir()).unwrap();
    let destination = ws.config.output_dir().join("alpha_905s_7s.mp4");
    fs::write(&destination, b"stale").unwrap();

    let (pool, calls) = pool(&ws.config, Behavior::Good);
    let run = pool.run(&[ClipSpec::new("alpha", 905, 7)]).unwrap();

    assert_eq!(run.reports[0].outcome, ExtractionOutcome::Extracted);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fs::read(&destination).unwrap(), GOOD);
}

#[test]
fn corrupted_output_is_deleted() {
    let ws = workspace(&["alpha.mp4"]);
    let (pool, _) = pool(&ws.config, Behavior::Corrupt);

    let run = pool.run(&[ClipSpec::new("alpha", 905, 7)]).unwrap();

    assert_eq!(run.summary.corrupted, 1);
    assert_eq!(run.reports[0].outcome, ExtractionOutcome::Corrupted);
    assert!(!ws.config.output_dir().join("alpha_905s_7s.mp4").exists());
}

#[test]
fn missing_asset_writes_nothing() {
    let ws = workspace(&["alpha.mp4"]);
    let (pool, calls) = pool(&ws.config, Behavior::Good);

    let run = pool.run(&[ClipSpec::new("nonexistent", 10, 7)]).unwrap();

    assert_eq!(run.summary.missing_asset, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(fs::read_dir(ws.config.output_dir()).unwrap().count(), 0);
}

#[test]
fn failed_extraction_removes_partial_file() {
    let ws = workspace(&["alpha.mp4"]);
    let (pool, _) = pool(&ws.config, Behavior::PartialThenFail);

    let run = pool.run(&[ClipSpec::new("alpha", 905, 7)]).unwrap();

    match &run.reports[0].outcome {
        ExtractionOutcome::Failed(reason) => assert!(reason.contains("encoder exploded")),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(run.summary.has_failures());
    assert!(!ws.config.output_dir().join("alpha_905s_7s.mp4").exists());
}

#[test]
fn worker_panic_becomes_failure() {
    let ws = workspace(&["alpha.mp4", "beta.mp4"]);
    let (pool, _) = pool(&ws.config, Behavior::Panic);

    let run = pool
        .run(&[ClipSpec::new("alpha", 905, 7), ClipSpec::new("beta", 30, 7)])
        .unwrap();

    assert_eq!(run.summary.failed, 2);
    assert_eq!(run.summary.not_run, 0);
    assert!(
        run.reports
            .iter()
            .all(|report| report.outcome == ExtractionOutcome::Failed("worker panicked".into()))
    );
}

#[test]
fn worker_panic_removes_partial_file() {
    let ws = workspace(&["alpha.mp4"]);
    let (pool, calls) = pool(&ws.config, Behavior::PartialThenPanic);

    let run = pool.run(&[ClipSpec::new("alpha", 905, 7)]).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        run.reports[0].outcome,
        ExtractionOutcome::Failed("worker panicked".into())
    );
    assert!(!ws.config.output_dir().join("alpha_905s_7s.mp4").exists());
}

#[test]
fn every_spec_gets_one_report() {
    let ws = workspace(&["alpha.mp4", "beta.mp4"]);
    let (pool, _) = pool(&ws.config, Behavior::Good);
    let mut many = Vec::new();
    for center in 0..50 {
        many.push(ClipSpec::new("alpha", center * 20, 7));
        many.push(ClipSpec::new("missing", center * 20, 7));
    }

    let run = pool.run(&many).unwrap();

    assert_eq!(run.reports.len(), 100);
    assert_eq!(run.summary.extracted, 50);
    assert_eq!(run.summary.missing_asset, 50);
    assert_eq!(run.summary.completed(), 100);
}

#[test]
fn missing_source_directory_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new()
        .with_source_dir(root.path().join("absent"))
        .with_output_dir(root.path().join("clips"));
    let (pool, _) = pool(&config, Behavior::Good);

    let result = pool.run(&specs());

    assert!(matches!(result, Err(ClipError::MissingSourceDirectory(_))));
    assert!(!root.path().join("clips").exists());
}

#[test]
fn empty_task_list_completes() {
    let ws = workspace(&[]);
    let (pool, _) = pool(&ws.config, Behavior::Good);

    let run = pool.run(&[]).unwrap();

    assert_eq!(run.summary.total, 0);
    assert!(run.reports.is_empty());
    assert!(ws.config.output_dir().is_dir());
}

// ── Cancellation ───────────────────────────────────────────────────

#[test]
fn cancelled_before_start_runs_nothing() {
    let ws = workspace(&["alpha.mp4"]);
    let token = CancellationToken::new();
    token.cancel();
    let (pool, calls) = pool(&ws.config, Behavior::Good);

    let run = pool.with_cancellation(token).run(&specs()).unwrap();

    assert_eq!(run.summary.not_run, 4);
    assert_eq!(run.summary.completed(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Cancels the run once the first task reports back.
struct CancelAfterFirst {
    token: CancellationToken,
}

impl ProgressCallback for CancelAfterFirst {
    fn on_progress(&self, _info: &ProgressInfo) {
        self.token.cancel();
    }
}

#[test]
fn cancellation_mid_run_leaves_tasks_not_run() {
    let ws = workspace(&["alpha.mp4"]);
    let config = ws.config.clone().with_worker_count(1);
    let token = CancellationToken::new();
    let (pool, _) = pool(&config, Behavior::Slow);
    let many: Vec<ClipSpec> = (0..20).map(|i| ClipSpec::new("alpha", i * 20, 7)).collect();

    let run = pool
        .with_cancellation(token.clone())
        .with_progress(Arc::new(CancelAfterFirst { token }))
        .run(&many)
        .unwrap();

    assert!(run.summary.completed() >= 1);
    assert!(run.summary.not_run > 0);
    assert_eq!(run.summary.completed() + run.summary.not_run, 20);
    assert_eq!(run.reports.len(), run.summary.completed());
}

// ── Progress ───────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    seen: std::sync::Mutex<Vec<(u64, u64)>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.seen.lock().unwrap().push((info.completed, info.total));
    }
}

#[test]
fn progress_counts_up_to_total() {
    let ws = workspace(&["alpha.mp4", "beta.mp4", "gamma.mp4"]);
    let recorder = Arc::new(Recorder::default());
    let (pool, _) = pool(&ws.config, Behavior::Good);

    pool.with_progress(recorder.clone()).run(&specs()).unwrap();

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(*seen, [(1, 4), (2, 4), (3, 4), (4, 4)]);
}
