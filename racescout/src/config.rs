use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{SearchError, SearchResult};

/// How to handle invalid UTF-8 in a dataset file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Reject the file with an encoding error
    #[default]
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep going
    Lossy,
}

impl std::str::FromStr for EncodingMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "failfast" | "fail-fast" => Ok(EncodingMode::FailFast),
            "lossy" => Ok(EncodingMode::Lossy),
            other => Err(SearchError::config_error(format!(
                "unknown encoding mode '{other}' (expected failfast or lossy)"
            ))),
        }
    }
}

/// Configuration for a race.
///
/// # Configuration Locations
///
/// Sources are layered, later ones overriding earlier ones:
/// 1. Global `$HOME/.config/racescout/config.yaml`
/// 2. Local `.racescout.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line values are applied last through [`RaceConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Dataset file, one entry per line
/// dataset_path: "strings.txt"
///
/// # Exact-match key
/// key: "abcd"
///
/// # Number of workers (default: CPU cores)
/// worker_count: 8
///
/// # Optional overall deadline, humantime syntax
/// deadline: "2s"
///
/// # failfast or lossy
/// encoding_mode: "lossy"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Line-oriented dataset file
    #[serde(default)]
    pub dataset_path: PathBuf,

    /// Key compared by exact equality against each line
    #[serde(default)]
    pub key: String,

    /// Number of workers, one per section
    #[serde(default = "default_worker_count")]
    pub worker_count: NonZeroUsize,

    /// Overall deadline for the race, e.g. "500ms" or "1m 30s"
    #[serde(default)]
    pub deadline: Option<String>,

    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::new(),
            key: String::new(),
            worker_count: default_worker_count(),
            deadline: None,
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl RaceConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an explicit file.
    ///
    /// The explicit file must exist; the default locations are optional.
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("racescout/config.yaml")),
            Some(PathBuf::from(".racescout.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(SearchError::file_not_found(path));
            }
            builder = builder.add_source(File::from(path));
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.deadline()?;
        Ok(config)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(path) = cli.dataset_path {
            self.dataset_path = path;
        }
        if let Some(key) = cli.key {
            self.key = key;
        }
        if let Some(workers) = cli.worker_count {
            self.worker_count = workers;
        }
        if cli.deadline.is_some() {
            self.deadline = cli.deadline;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// Parses the configured deadline, if any
    pub fn deadline(&self) -> SearchResult<Option<Duration>> {
        self.deadline
            .as_deref()
            .map(|raw| {
                humantime::parse_duration(raw).map_err(|e| {
                    SearchError::config_error(format!("invalid deadline '{raw}': {e}"))
                })
            })
            .transpose()
    }
}

/// Values supplied on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dataset_path: Option<PathBuf>,
    pub key: Option<String>,
    pub worker_count: Option<NonZeroUsize>,
    pub deadline: Option<String>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}
