use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use shotsplit_core::{
    annotation::{VideoIntelligenceClient, auth::CREDENTIALS_ENV, resolve_token_source},
    config::{CutMode, DetectionFailurePolicy, PipelineConfig, TimelineMode},
    format::{format_elapsed, format_summary},
    media::Ffmpeg,
    source::YtDlp,
    state::PipelineState,
};
use tokio::sync::watch;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::pipeline::{Collaborators, start_pipeline};

mod pipeline;
mod workers;

#[derive(Clone, Copy, Default, ValueEnum)]
enum CliTimeline {
    /// Shift each segment's shots by the segment's start offset
    #[default]
    Offset,
    /// Append segment-local offsets unchanged
    Concat,
}

impl From<CliTimeline> for TimelineMode {
    fn from(cli: CliTimeline) -> Self {
        match cli {
            CliTimeline::Offset => TimelineMode::SegmentOffset,
            CliTimeline::Concat => TimelineMode::Concatenate,
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum CliDetectionPolicy {
    /// Fail the run
    #[default]
    Abort,
    /// Continue without the failed segment's shots
    Skip,
}

impl From<CliDetectionPolicy> for DetectionFailurePolicy {
    fn from(cli: CliDetectionPolicy) -> Self {
        match cli {
            CliDetectionPolicy::Abort => DetectionFailurePolicy::Abort,
            CliDetectionPolicy::Skip => DetectionFailurePolicy::SkipSegment,
        }
    }
}

#[derive(Parser)]
#[command(name = "shotsplit")]
#[command(about = "Download a video, detect its shot boundaries and cut one clip per shot")]
struct Cli {
    /// Video URL
    url: String,

    /// Service-account key file for the annotation service
    #[arg(long, env = CREDENTIALS_ENV)]
    credentials: Option<PathBuf>,

    /// Segment length in seconds
    #[arg(long, default_value_t = 1800.0)]
    part_duration: f64,

    /// Where the source video and its segments are written
    #[arg(long, default_value = "downloads")]
    downloads_dir: PathBuf,

    /// Where the clips are written
    #[arg(long, default_value = "cuts")]
    cuts_dir: PathBuf,

    /// How segment shot offsets map onto the source timeline
    #[arg(long, value_enum, default_value_t = CliTimeline::Offset)]
    timeline: CliTimeline,

    /// What to do when shot detection fails for a segment
    #[arg(long, value_enum, default_value_t = CliDetectionPolicy::Abort)]
    on_detection_error: CliDetectionPolicy,

    /// Re-encode clips instead of stream-copying (frame-accurate, slower)
    #[arg(long)]
    reencode: bool,

    /// Maximum concurrent cuts (defaults to the number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn to_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.url.clone());
        config.credentials_path = self.credentials.clone();
        config.part_duration_secs = self.part_duration;
        config.downloads_dir = self.downloads_dir.clone();
        config.cuts_dir = self.cuts_dir.clone();
        config.timeline_mode = self.timeline.into();
        config.detection_failure_policy = self.on_detection_error.into();
        if self.reencode {
            config.cut_mode = CutMode::Reencode;
        }
        if let Some(jobs) = self.jobs {
            config.cut_concurrency = jobs;
        }
        config
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(spinner_style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn running_message(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Downloading => "Downloading video...",
        PipelineState::Segmenting => "Splitting into segments...",
        PipelineState::Detecting => "Detecting shots...",
        PipelineState::Reconciling => "Reconciling timeline...",
        PipelineState::Cutting => "Cutting clips...",
        _ => "Working...",
    }
}

fn finished_message(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Downloading => "Downloaded",
        PipelineState::Segmenting => "Segmented",
        PipelineState::Detecting => "Shots detected",
        PipelineState::Reconciling => "Timeline reconciled",
        PipelineState::Cutting => "Clips cut",
        _ => "Finished",
    }
}

/// One spinner per stage, finished when the tracker reports the next state.
async fn render_progress(mut state_rx: watch::Receiver<PipelineState>) {
    let mut current: Option<(PipelineState, ProgressBar, Instant)> = None;

    loop {
        let state = *state_rx.borrow_and_update();

        if current.as_ref().map(|(s, _, _)| *s) != Some(state) {
            if let Some((prev, pb, started)) = current.take() {
                let elapsed = style(format!("[{}]", format_elapsed(started.elapsed()))).dim();
                if state == PipelineState::Failed {
                    pb.abandon_with_message(format!(
                        "{} {} {}",
                        style("✗").red().bold(),
                        running_message(prev).trim_end_matches("..."),
                        elapsed
                    ));
                } else {
                    pb.finish_with_message(format!(
                        "{} {} {}",
                        style("✓").green().bold(),
                        finished_message(prev),
                        elapsed
                    ));
                }
            }

            if state.is_terminal() {
                return;
            }
            if state != PipelineState::Idle {
                current = Some((state, create_spinner(running_message(state)), Instant::now()));
            }
        }

        if state_rx.changed().await.is_err() {
            return;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.to_config();
    if let Err(e) = config.validate() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(2);
    }

    // Validate credentials before downloading anything
    let tokens = match resolve_token_source(config.credentials_path.as_deref(), &config.tools.gcloud)
    {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(2);
        }
    };

    println!(
        "\n{}  {}\n",
        style("shotsplit").cyan().bold(),
        style("Shot Splitter").dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let config = Arc::new(config);
    let collaborators = Collaborators {
        source: Arc::new(YtDlp::new(config.tools.yt_dlp.clone())),
        engine: Arc::new(Ffmpeg::new(&config.tools)),
        annotator: Arc::new(VideoIntelligenceClient::new(&config, tokens)),
    };

    let total_start = Instant::now();
    let handle = start_pipeline(Arc::clone(&config), collaborators)?;
    let progress = tokio::spawn(render_progress(handle.state_rx.clone()));
    handle.submit(config.source_url.clone());

    let outcome = handle.wait().await?;
    if let Err(e) = progress.await {
        warn!(error = %e, "Progress display stopped abnormally");
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_elapsed(total_start.elapsed())).cyan().bold()
    );

    match outcome {
        Ok(summary) => {
            println!(
                "{} {}\n",
                style("Saved:").dim(),
                style(config.cuts_dir.display()).cyan()
            );
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_summary(&summary));
            Ok(())
        }
        Err(failed) => {
            eprintln!(
                "{} stage {} failed: {}",
                style("Error:").red().bold(),
                style(failed.stage).yellow(),
                failed.message
            );
            std::process::exit(1);
        }
    }
}
