//! Layered configuration.
//!
//! Later layers win:
//! 1. built-in defaults,
//! 2. a configuration file: the one given explicitly, or else the first of
//!    `skyreg.toml`, `skyreg.yaml`, `skyreg.yml`, `skyreg.json` found in the
//!    platform configuration directory,
//! 3. `SKYREG_*` environment variables (`SKYREG_BATCH_SIZE=500`),
//! 4. command-line [`Overrides`].

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use skyreg_astro::{MAX_RESOLUTION, Timescale};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{debug, instrument};

pub const ENV_PREFIX: &str = "SKYREG_";
const FILE_STEM: &str = "skyreg";
const FILE_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Registry file to create.
    pub output: PathBuf,
    /// Exposures inserted per transaction.
    pub batch_size: usize,
    /// Angle added around every image footprint, radians.
    pub padding_rad: f64,
    /// Sky tiles along each cube-face edge.
    pub resolution: u32,
    /// Directories whose name ends with this hold one run per sub-directory.
    pub container_suffix: String,
    /// Timescale `taiObs` is written in.
    pub timescale: Timescale,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("registry.sqlite3"),
            batch_size: 100,
            // About 15 arcseconds.
            padding_rad: 0.000075,
            resolution: 3,
            container_suffix: "runs".to_string(),
            timescale: Timescale::Utc,
            log_level: "info".to_string(),
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Config {
    /// Load, merge and validate every layer.
    #[instrument(level = "debug", skip(overrides))]
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file = match file {
            Some(file) if !file.is_file() => exn::bail!(ErrorKind::NotFound(file.to_path_buf())),
            Some(file) => Some(file.to_path_buf()),
            None => Self::default_file(),
        };
        let config: Self = Self::figment(file.as_deref())?
            .merge(Serialized::defaults(overrides))
            .extract()
            .or_raise(|| ErrorKind::Extract)?;
        config.validate()?;
        debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Defaults, then `file`, then the environment.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
                Some("json") => figment.merge(Json::file_exact(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// The first configuration file present in the platform configuration
    /// directory (`~/.config/skyreg` on Linux).
    pub fn default_file() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("", "", FILE_STEM)?;
        Self::find_file(dirs.config_dir())
    }

    fn find_file(dir: &Path) -> Option<PathBuf> {
        FILE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{FILE_STEM}.{ext}")))
            .find(|path| path.is_file())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field, reason: &str| ErrorKind::InvalidValue { field, reason: reason.to_string() };
        if self.output.as_os_str().is_empty() {
            exn::bail!(invalid("output", "must not be empty"));
        }
        if self.batch_size == 0 {
            exn::bail!(invalid("batch_size", "must be at least 1"));
        }
        if !self.padding_rad.is_finite() || self.padding_rad < 0.0 {
            exn::bail!(invalid("padding_rad", "must be a finite, non-negative angle"));
        }
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            exn::bail!(invalid("resolution", &format!("must be between 1 and {MAX_RESOLUTION}")));
        }
        if self.container_suffix.is_empty() {
            exn::bail!(invalid("container_suffix", "must not be empty"));
        }
        if self.log_level.parse::<LevelFilter>().is_err() {
            exn::bail!(invalid("log_level", "must be one of off, error, warn, info, debug, trace"));
        }
        Ok(())
    }
}
