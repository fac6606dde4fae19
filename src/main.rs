#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast::app_config::{self, Config, UNIT_CONFIG_FILE};
use slidecast::app_controller::{Collaborators, Controller};
use slidecast::file_utils::{FileManager, UnitLayout};
use slidecast::media::FfmpegTool;
use slidecast::progress::{ProgressCallback, ProgressUpdate};

/// Resolution of the unit progress bar
const UNIT_BAR_LENGTH: u64 = 1000;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Produce videos for every video_<N> folder under ROOT, or one unit with --unit
    Produce {
        /// Folder holding the video_<N> unit folders
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Only process this unit folder name (e.g. video_3)
        #[arg(short, long)]
        unit: Option<String>,
    },

    /// Create the folder structure of a new unit
    Init {
        /// Unit folder to create (e.g. projects/video_1)
        #[arg(value_name = "UNIT_DIR")]
        unit_dir: PathBuf,
    },

    /// Generate shell completions for slidecast
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// slidecast - narrated slideshow videos from images and a script
#[derive(Parser, Debug)]
#[command(name = "slidecast")]
#[command(version)]
#[command(about = "Narrated slideshow video generator")]
#[command(long_about = "slidecast turns folders of images and a text script into narrated, captioned slideshow videos.

EXAMPLES:
    slidecast init projects/video_1            # Create a unit folder
    slidecast produce projects                 # Produce every video_<N> unit
    slidecast produce projects --unit video_2  # Produce a single unit
    slidecast --seed 42 produce projects       # Reproducible effect and preset draws
    slidecast completions bash > slidecast.bash

UNIT FOLDERS:
    img/        slide images           text/      script (.txt)
    voice/      narration output       subtitles/ captions (existing files are reused)
    slideshow/  silent slideshow       output/    final video
    intro/ outro/ auth/                optional bookend and webcam clips
    config.json                        per-unit options

CONFIGURATION:
    Application settings are stored in conf.json by default. If the file does
    not exist, a default one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Seed for effect, preset and image draws
    #[arg(short, long, global = true)]
    seed: Option<u64>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
    progress: Option<MultiProgress>,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter, progress: Option<MultiProgress>) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level, progress }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let now = chrono::Local::now().format("%H:%M:%S%.3f");
        let line = format!("\x1B[{}m{} {:<5} {}\x1B[0m", Self::color_for_level(record.level()), now, record.level(), record.args());

        // Print above the bars so they are not torn
        match &self.progress {
            Some(progress) if !progress.is_hidden() => {
                let _ = progress.println(line);
            }
            _ => {
                let _ = writeln!(std::io::stderr(), "{}", line);
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

/// Unit bar fed by the controller's progress updates
fn unit_progress(multi_progress: &MultiProgress) -> (ProgressBar, ProgressCallback) {
    let bar = multi_progress.add(ProgressBar::new(UNIT_BAR_LENGTH));
    bar.set_style(bar_style("{spinner:.green} {prefix:>10} [{bar:40.cyan/blue}] {percent:>3}% {msg}"));
    let handle = bar.clone();
    let callback: ProgressCallback = Arc::new(move |update: &ProgressUpdate| {
        handle.set_prefix(update.unit.clone());
        handle.set_position((update.fraction * UNIT_BAR_LENGTH as f64).round() as u64);
        handle.set_message(format!("{}: {}", update.stage, update.message));
    });
    (bar, callback)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "slidecast", &mut std::io::stdout());
        return Ok(());
    }

    let multi_progress = MultiProgress::new();
    CustomLogger::init(LevelFilter::Trace, Some(multi_progress.clone()))?;
    let initial_level = cli
        .log_level
        .clone()
        .map(|l| app_config::LogLevel::from(l).to_level_filter())
        .unwrap_or(LevelFilter::Info);
    log::set_max_level(initial_level);

    let mut config = Config::load_or_create(&cli.config)?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Produce { root, unit } => produce(config, &root, unit.as_deref(), &multi_progress).await,
        Commands::Init { unit_dir } => init_unit(&config, &unit_dir),
        Commands::Completions { .. } => Ok(()),
    }
}

async fn produce(config: Config, root: &Path, unit: Option<&str>, multi_progress: &MultiProgress) -> Result<()> {
    FfmpegTool::new(&config.encode)
        .check_available()
        .await
        .context("ffmpeg is required to produce videos")?;

    let collaborators = Collaborators::from_config(&config);
    let (unit_bar, callback) = unit_progress(multi_progress);
    let mut controller = Controller::with_config(config, collaborators)?.with_progress(callback);

    if let Some(name) = unit {
        let unit_dir = root.join(name);
        if !unit_dir.is_dir() {
            return Err(anyhow!("Unit folder does not exist: {:?}", unit_dir));
        }
        let outcome = controller.run_unit(&unit_dir).await;
        unit_bar.finish_and_clear();
        return match outcome.output {
            Some(output) => {
                info!("Success: {}", output.display());
                Ok(())
            }
            None => Err(anyhow!("{} failed: {}", outcome.name, outcome.reason.unwrap_or_default())),
        };
    }

    let batch_bar = multi_progress.insert(0, ProgressBar::new(0));
    batch_bar.set_style(bar_style(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} units ({percent}%) {msg}",
    ));
    batch_bar.set_message("Processing units");

    let handle = batch_bar.clone();
    let report = controller
        .run_batch(root, move |done, total| {
            handle.set_length(total as u64);
            handle.set_position(done as u64);
        })
        .await;
    unit_bar.finish_and_clear();

    let report = report?;
    batch_bar.finish_with_message(report.summary());
    if report.failed() > 0 {
        warn!("{} unit(s) failed", report.failed());
    }
    Ok(())
}

fn init_unit(config: &Config, unit_dir: &Path) -> Result<()> {
    let layout = UnitLayout::new(unit_dir);
    layout.init()?;

    if FileManager::file_exists(unit_dir.join(UNIT_CONFIG_FILE)) {
        info!("Keeping existing {} in {:?}", UNIT_CONFIG_FILE, unit_dir);
    } else {
        config.unit_defaults.save(unit_dir)?;
    }
    info!("Initialized unit folder {:?}", unit_dir);
    Ok(())
}
