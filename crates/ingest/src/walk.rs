//! Walk run directories and register every corrected frame found in them.

use crate::classify::{Classified, classify};
use crate::error::{ErrorKind, Result};
use crate::extract::read_metadata;
use crate::footprint::sky_tiles;
use exn::{OptionExt, ResultExt};
use skyreg_astro::QuadSpherePixelization;
use skyreg_config::Config;
use skyreg_registry::{Exposure, Registry};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Per-run tally of what happened to each candidate file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Registered by this walk.
    pub processed: u64,
    /// Already present in the registry.
    pub skipped: u64,
    /// Matched the listing pattern but not the frame naming scheme.
    pub unrecognized: u64,
    /// Recognised, but unreadable or unusable.
    pub failed: u64,
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.unrecognized += other.unrecognized;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Every run walked, in order.
    pub runs: Vec<(PathBuf, RunSummary)>,
    pub total: RunSummary,
}

enum Outcome {
    Processed,
    Skipped,
    Unrecognized,
    Failed,
}

impl AddAssign<Outcome> for RunSummary {
    fn add_assign(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Unrecognized => self.unrecognized += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

pub struct Walker<'a> {
    registry: &'a mut Registry,
    pixelization: &'a QuadSpherePixelization,
    config: &'a Config,
    /// Exposures inserted since the last commit.
    pending: usize,
}

impl<'a> Walker<'a> {
    pub fn new(registry: &'a mut Registry, pixelization: &'a QuadSpherePixelization, config: &'a Config) -> Self {
        Self { registry, pixelization, config, pending: 0 }
    }

    /// Walk each directory in turn. A directory whose name ends with the
    /// configured container suffix holds one run per sub-directory; any other
    /// directory is a run itself.
    ///
    /// Stops at the first registry or listing error. Batches committed before
    /// that point stay committed.
    pub async fn walk_all(&mut self, dirs: &[PathBuf]) -> Result<WalkSummary> {
        let mut summary = WalkSummary::default();
        for dir in dirs {
            for run in self.runs(dir)? {
                let run_summary = self.walk_run(&run).await?;
                summary.total += run_summary;
                summary.runs.push((run, run_summary));
            }
        }
        Ok(summary)
    }

    fn runs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let is_container = dir
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.config.container_suffix));
        if !is_container {
            return Ok(vec![dir.to_path_buf()]);
        }
        let listing = || ErrorKind::Listing(dir.display().to_string());
        let mut runs = Vec::new();
        for entry in std::fs::read_dir(dir).or_raise(listing)? {
            let path = entry.or_raise(listing)?.path();
            if path.is_dir() {
                runs.push(path);
            }
        }
        runs.sort();
        debug!(container = %dir.display(), runs = runs.len(), "found runs in container");
        Ok(runs)
    }

    /// Register every frame under `<run>/*/corr/[1-6]/`, committing every
    /// `batch_size` inserts and once more at the end.
    #[instrument(skip(self), fields(run = %run.display()))]
    pub async fn walk_run(&mut self, run: &Path) -> Result<RunSummary> {
        info!("started");
        if !run.is_dir() {
            warn!("run directory does not exist");
        }
        let mut summary = RunSummary::default();
        for candidate in candidates(run)? {
            let outcome = match candidate {
                Ok(path) => self.ingest(&path).await?,
                Err(err) => {
                    warn!(path = %err.path().display(), error = %err.error(), "cannot read candidate");
                    Outcome::Failed
                },
            };
            summary += outcome;
        }
        self.commit().await?;
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            unrecognized = summary.unrecognized,
            failed = summary.failed,
            "finished run"
        );
        Ok(summary)
    }

    async fn ingest(&mut self, path: &Path) -> Result<Outcome> {
        let Some(classified) = classify(path) else {
            warn!(path = %path.display(), "unrecognized filename");
            return Ok(Outcome::Unrecognized);
        };
        if self.registry.contains(&classified.key).await.or_raise(|| ErrorKind::Registry)? {
            debug!(key = %classified.key, "already registered");
            return Ok(Outcome::Skipped);
        }
        let (exposure, tiles) = match self.prepare(path, classified) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot register exposure");
                return Ok(Outcome::Failed);
            },
        };
        let Some(id) = self.registry.insert_exposure(&exposure).await.or_raise(|| ErrorKind::Registry)? else {
            return Ok(Outcome::Skipped);
        };
        self.registry.insert_coverage(id, &tiles).await.or_raise(|| ErrorKind::Registry)?;
        debug!(key = %exposure.key, id, tiles = tiles.len(), "registered exposure");

        self.pending += 1;
        if self.pending >= self.config.batch_size {
            self.commit().await?;
        }
        Ok(Outcome::Processed)
    }

    fn prepare(&self, path: &Path, classified: Classified) -> Result<(Exposure, Vec<u64>)> {
        let metadata = read_metadata(path, classified.compression)?;
        let tiles = sky_tiles(
            &metadata.wcs,
            metadata.width,
            metadata.height,
            self.config.padding_rad,
            self.pixelization,
        )?;
        let tai_obs = metadata.observed.to_civil_string(self.config.timescale).map_err(ErrorKind::timestamp)?;
        let exposure = Exposure { key: classified.key, tai_obs, exp_time: metadata.exp_time };
        Ok((exposure, tiles))
    }

    async fn commit(&mut self) -> Result<()> {
        self.registry.commit().await.or_raise(|| ErrorKind::Registry)?;
        self.pending = 0;
        Ok(())
    }
}

/// Candidate frames in `run`, in lexicographic order.
fn candidates(run: &Path) -> Result<glob::Paths> {
    let listing = || ErrorKind::Listing(run.display().to_string());
    let run = run.to_str().ok_or_raise(listing)?;
    let pattern = format!("{}/*/corr/[1-6]/fpC*.fit*", glob::Pattern::escape(run));
    glob::glob(&pattern).or_raise(listing)
}
