use std::{path::PathBuf, sync::Arc};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use clipsampler::{
    ExtractionOutcome, ExtractionStrategy, FfmpegLogLevel, MediaProbe, PipelineConfig,
    ProgressCallback, ProgressInfo, TaskList, TaskReport, WorkerPool, check_directory,
    plan_from_annotations, plan_from_windows,
};

const CLI_AFTER_HELP: &str = "Examples:\n  clipsampler sample ava_train_v2.2.csv --source videos/trainval --out sampled_clips\n  clipsampler windows --filter relevant_ids.txt --source videos --out clips --strategy stream-copy\n  clipsampler plan ava_train_v2.2.csv --json\n  clipsampler check sampled_clips --expect-frames 210\n  clipsampler completions zsh > _clipsampler";

#[derive(Debug, Parser)]
#[command(
    name = "clipsampler",
    version,
    about = "Cluster video annotations into clips and extract them with FFmpeg",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show informational log output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar instead of one line per clip.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, verbose, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// YAML configuration file. Command-line flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of extraction workers.
    #[arg(long, global = true)]
    workers: Option<usize>,
}

/// Options shared by every command that plans or extracts clips.
#[derive(Debug, Args, Clone, Default)]
struct PipelineArgs {
    /// Directory holding the source videos.
    #[arg(long)]
    source: Option<PathBuf>,
    /// Directory receiving the clips.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Extraction strategy: frame-accurate | stream-copy.
    #[arg(long)]
    strategy: Option<String>,
    /// Clustering window in seconds.
    #[arg(long)]
    window: Option<f64>,
    /// Shortest clustered clip in seconds.
    #[arg(long)]
    min_duration: Option<u32>,
    /// Longest clustered clip in seconds.
    #[arg(long)]
    max_duration: Option<u32>,
    /// Seconds added to each cluster's span.
    #[arg(long)]
    buffer: Option<f64>,
    /// Sliding window length in seconds.
    #[arg(long)]
    window_size: Option<u32>,
    /// Seconds between sliding window starts.
    #[arg(long)]
    stride: Option<u32>,
    /// Re-encode quality for frame-accurate extraction (0-51, lower is better).
    #[arg(long)]
    crf: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Cluster annotated events into clips and extract them.
    #[command(
        about = "Extract clips around annotated events",
        after_help = "Examples:\n  clipsampler sample ava_train_v2.2.csv --source videos/trainval --out sampled_clips\n  clipsampler sample events.csv --window 3 --min-duration 5 --max-duration 10 --progress"
    )]
    Sample {
        /// Headerless CSV whose rows start with video_id,timestamp.
        annotations: PathBuf,
        #[command(flatten)]
        options: PipelineArgs,
    },

    /// Cut whole videos into fixed-size windows and extract them.
    #[command(
        about = "Extract sliding-window clips",
        after_help = "Examples:\n  clipsampler windows --filter relevant_ids.txt --source videos --out clips\n  clipsampler windows --window-size 10 --stride 5 --strategy stream-copy"
    )]
    Windows {
        /// File listing eligible video ids, one per line.
        #[arg(long)]
        filter: Option<PathBuf>,
        #[command(flatten)]
        options: PipelineArgs,
    },

    /// Print the clip list an annotation file would produce.
    #[command(
        about = "Print planned clips without extracting",
        after_help = "Examples:\n  clipsampler plan ava_train_v2.2.csv\n  clipsampler plan ava_train_v2.2.csv --json > tasks.json"
    )]
    Plan {
        annotations: PathBuf,
        /// Output the plan as machine-readable JSON.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        options: PipelineArgs,
    },

    /// Validate a directory of extracted clips.
    #[command(
        about = "Check extracted clips",
        after_help = "Examples:\n  clipsampler check sampled_clips\n  clipsampler check clips --expect-frames 450 --json"
    )]
    Check {
        dir: PathBuf,
        /// Output the results as machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Flag clips whose frame count differs from this.
        #[arg(long)]
        expect_frames: Option<u64>,
        /// Clip file extension to look for. Defaults to the configured
        /// output extension.
        #[arg(long)]
        ext: Option<String>,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_strategy(value: &str) -> Option<ExtractionStrategy> {
    value.parse().ok()
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    value.parse().ok()
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global.verbose);

    let level = match &global.log_level {
        Some(level) => {
            parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?
        }
        None => FfmpegLogLevel::default(),
    };
    clipsampler::set_ffmpeg_log_level(level);
    Ok(())
}

/// Config file (or defaults), then flags, then validation.
fn build_config(
    global: &GlobalOptions,
    options: &PipelineArgs,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &global.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::new(),
    };

    if let Some(source) = &options.source {
        config = config.with_source_dir(source);
    }
    if let Some(out) = &options.out {
        config = config.with_output_dir(out);
    }
    if let Some(strategy) = &options.strategy {
        let parsed =
            parse_strategy(strategy).ok_or(format!("unsupported --strategy: {strategy}"))?;
        config = config.with_strategy(parsed);
    }
    if let Some(workers) = global.workers {
        config = config.with_worker_count(workers);
    }
    if let Some(crf) = options.crf {
        config = config.with_crf(crf);
    }

    let mut cluster = *config.cluster();
    if let Some(window) = options.window {
        cluster.window = window;
    }
    if let Some(min_duration) = options.min_duration {
        cluster.min_duration = min_duration;
    }
    if let Some(max_duration) = options.max_duration {
        cluster.max_duration = max_duration;
    }
    if let Some(buffer) = options.buffer {
        cluster.buffer = buffer;
    }

    let mut windows = *config.windows();
    if let Some(window_size) = options.window_size {
        windows.window_size = window_size;
    }
    if let Some(stride) = options.stride {
        windows.stride = stride;
    }

    let config = config
        .with_cluster_options(cluster)
        .with_window_options(windows);
    config.validate()?;
    Ok(config)
}

fn status_word(outcome: &ExtractionOutcome) -> ColoredString {
    let label = outcome.label();
    match outcome {
        ExtractionOutcome::Extracted => label.green(),
        ExtractionOutcome::Skipped => label.cyan(),
        ExtractionOutcome::MissingAsset => label.yellow(),
        ExtractionOutcome::Corrupted => label.red(),
        ExtractionOutcome::Failed(_) => label.red().bold(),
    }
}

/// The report's own `Display` line with its status word coloured.
fn render_report(report: &TaskReport) -> String {
    let line = report.to_string();
    match line.strip_prefix(report.outcome.label()) {
        Some(rest) => format!("{}{rest}", status_word(&report.outcome)),
        None => line,
    }
}

/// `--ext`, else the output extension of `--config`, else the default.
fn check_extension(
    global: &GlobalOptions,
    ext: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(ext) = ext {
        return Ok(ext);
    }
    let config = match &global.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::new(),
    };
    Ok(config.output_extension().to_string())
}

/// Prints one line per finished clip.
struct LineProgress;

impl ProgressCallback for LineProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(report) = &info.last {
            println!("{}", render_report(report));
        }
    }
}

/// Drives an `indicatif` bar; problem clips are printed above it.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(total: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(total as u64);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(report) = &info.last {
            if !report.outcome.is_success() {
                self.bar.println(render_report(report));
            }
        }
        self.bar.set_position(info.completed);
        if let Some(remaining) = info.estimated_remaining {
            self.bar.set_message(format!("eta {}s", remaining.as_secs()));
        }
    }
}

fn extract(
    tasks: &TaskList,
    config: &PipelineConfig,
    global: &GlobalOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if tasks.is_empty() {
        println!("{} {}", "warning:".yellow().bold(), "No clips to extract".yellow());
        return Ok(());
    }

    let bar = if global.progress {
        Some(Arc::new(BarProgress::new(tasks.len())?))
    } else {
        None
    };
    let callback: Arc<dyn ProgressCallback> = match &bar {
        Some(bar) => Arc::clone(bar) as Arc<dyn ProgressCallback>,
        None => Arc::new(LineProgress),
    };

    let run = WorkerPool::from_config(config)
        .with_progress(callback)
        .run(tasks.as_slice())?;

    if let Some(bar) = bar {
        bar.bar.finish_with_message("done");
    }

    println!("{}", run.summary);
    let message = format!(
        "Processed {} clip(s) into {} in {:.1}s",
        run.summary.completed(),
        config.output_dir().display(),
        run.summary.elapsed.as_secs_f64(),
    );
    if run.summary.has_failures() {
        println!("{} {}", "warning:".yellow().bold(), message.yellow());
    } else {
        println!("{} {}", "success:".green().bold(), message.green());
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Sample {
            annotations,
            options,
        } => {
            let config = build_config(&cli.global, &options)?;
            let tasks = plan_from_annotations(&annotations, &config)?;
            extract(&tasks, &config, &cli.global)?;
        }
        Commands::Windows { filter, options } => {
            let config = build_config(&cli.global, &options)?;
            let tasks = plan_from_windows(filter.as_deref(), &config, &MediaProbe)?;
            extract(&tasks, &config, &cli.global)?;
        }
        Commands::Plan {
            annotations,
            json,
            options,
        } => {
            let config = build_config(&cli.global, &options)?;
            let tasks = plan_from_annotations(&annotations, &config)?;
            let extension = config.output_extension();
            if json {
                let payload: Vec<_> = tasks
                    .iter()
                    .map(|spec| {
                        json!({
                            "video_id": spec.video_id,
                            "center": spec.center,
                            "duration": spec.duration,
                            "start": spec.start_seconds(),
                            "file": spec.file_name(extension),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for spec in &tasks {
                    println!(
                        "{}\t{}\t{}\t{}",
                        spec.video_id,
                        spec.center,
                        spec.duration,
                        spec.file_name(extension)
                    );
                }
                eprintln!("{} {} clip(s) planned", "info:".cyan().bold(), tasks.len());
            }
        }
        Commands::Check {
            dir,
            json,
            expect_frames,
            ext,
        } => {
            let ext = check_extension(&cli.global, ext)?;
            let check = check_directory(&dir, &[ext], expect_frames)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&check)?);
            } else {
                for file in &check.files {
                    if !file.report.is_valid() || file.has_frame_mismatch() {
                        println!("{}", file.file.bold());
                        print!("{}", file.report);
                    }
                }
                let summary = &check.summary;
                println!("Total clips checked: {}", summary.total);
                println!("Valid:               {}", summary.valid.to_string().green());
                println!("Errors:              {}", summary.errors.to_string().red());
                if let Some(expected) = expect_frames {
                    println!(
                        "Not {expected} frames:     {}",
                        summary.frame_mismatches.to_string().yellow()
                    );
                }
                println!(
                    "Total size:          {:.2} MB",
                    summary.valid_bytes as f64 / (1024.0 * 1024.0)
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "clipsampler", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
