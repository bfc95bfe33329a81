//! Build an SQLite registry of survey exposures and the sky tiles they cover.
//!
//! ```text
//! skyreg [-i <existing.sqlite3>] [-o <registry.sqlite3>] <DIR>...
//! ```
//!
//! The output registry is never overwritten. Given `-i`, the existing
//! registry is copied to the output and extended; exposures it already holds
//! are skipped.

mod error;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser};
use exn::ResultExt;
use skyreg_astro::QuadSpherePixelization;
use skyreg_config::{Config, Overrides};
use skyreg_ingest::{WalkSummary, Walker};
use skyreg_registry::Registry;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LEVELS: [LevelFilter; 6] = [
    LevelFilter::OFF,
    LevelFilter::ERROR,
    LevelFilter::WARN,
    LevelFilter::INFO,
    LevelFilter::DEBUG,
    LevelFilter::TRACE,
];

#[derive(Debug, Parser)]
#[command(name = "skyreg", version, about)]
struct Cli {
    /// Run directories, or containers of run directories, to register.
    #[arg(required = true, num_args = 1..)]
    dirs: Vec<PathBuf>,
    /// Existing registry to copy and extend.
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Registry to create; must not exist yet.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// More logging; repeat for more.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Less logging; repeat for less.
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides { output: self.output.clone() }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref(), &cli.overrides()).or_raise(|| ErrorKind::Config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        },
    };
    init_logging(log_level(&config.log_level, cli.verbose, cli.quiet));

    match run(&cli, &config).await {
        Ok(summary) => {
            info!(
                runs = summary.runs.len(),
                processed = summary.total.processed,
                skipped = summary.total.skipped,
                unrecognized = summary.total.unrecognized,
                failed = summary.total.failed,
                "done"
            );
            ExitCode::SUCCESS
        },
        Err(err) => {
            error!(error = %err, "aborted");
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: &Cli, config: &Config) -> Result<WalkSummary> {
    let pixelization = QuadSpherePixelization::new(config.resolution).or_raise(|| ErrorKind::Config)?;
    let mut registry = Registry::create(&config.output, cli.input.as_deref()).await.or_raise(|| ErrorKind::Registry)?;
    let walked = walk(&mut registry, &pixelization, config, &cli.dirs).await;
    // The registry is closed whether or not the walk finished.
    let closed = registry.close().await.or_raise(|| ErrorKind::Registry);
    let summary = walked?;
    closed?;
    Ok(summary)
}

async fn walk(
    registry: &mut Registry,
    pixelization: &QuadSpherePixelization,
    config: &Config,
    dirs: &[PathBuf],
) -> Result<WalkSummary> {
    let existing = registry.count().await.or_raise(|| ErrorKind::Registry)?;
    info!(output = %config.output.display(), existing, tiles = pixelization.len(), "opened registry");
    Walker::new(registry, pixelization, config).walk_all(dirs).await.or_raise(|| ErrorKind::Walk)
}

/// `RUST_LOG` wins; otherwise the configured level, moved up one step per
/// `-v` and down one per `-q`.
fn log_level(configured: &str, verbose: u8, quiet: u8) -> LevelFilter {
    let base = configured.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let index = LEVELS.iter().position(|level| *level == base).unwrap_or(3) as i32;
    let index = (index + i32::from(verbose) - i32::from(quiet)).clamp(0, LEVELS.len() as i32 - 1);
    LEVELS[index as usize]
}

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .init();
}
