use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "partmatch.toml";
pub const ENV_PREFIX: &str = "PARTMATCH";

/// Effective configuration for the CLI and the resolver.
///
/// Layered as: built-in defaults, then the user config file, then a local
/// `partmatch.toml` (or the file passed with `--config`), then `PARTMATCH_*`
/// environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub catalog: CatalogConfig,
    pub matching: MatchingConfig,
    pub scan: ScanConfig,
    pub output: OutputConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub user_agent: String,
    pub results_per_page: u32,
    pub timeout_seconds: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Pause between two models in a batch
    pub request_delay_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.bricklink.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; U; Linux i686) Gecko/20071127 Firefox/2.0.0.11"
                .to_string(),
            results_per_page: 500,
            timeout_seconds: 30,
            initial_backoff_ms: 500,
            max_backoff_ms: 60_000,
            request_delay_ms: 500,
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Longest search query sent to the catalog, in characters
    pub max_query_len: usize,
    /// Title phrases never sent to the search endpoint
    pub stop_phrases: Vec<String>,
    pub use_inventory: bool,
    pub weighted_fallback: bool,
    /// Local vocabulary to catalog vocabulary, keyed by lower-case phrase
    pub phrase_map: BTreeMap<String, String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let mut phrase_map = BTreeMap::new();
        phrase_map.insert("2-sided".to_string(), "Dual Sided".to_string());
        phrase_map.insert("minifig".to_string(), "Minifigure".to_string());

        Self {
            max_query_len: 75,
            stop_phrases: vec!["pattern".to_string(), "/".to_string()],
            use_inventory: true,
            weighted_fallback: true,
            phrase_map,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub include_patterns: Vec<String>,
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_patterns: vec!["*.dat".to_string()],
            follow_symlinks: false,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: ReportFormat,
    pub colors: bool,
    pub verbose: bool,
    /// Only warnings, errors and the report itself
    pub quiet: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Csv,
            colors: true,
            verbose: false,
            quiet: false,
        }
    }
}

/// Run cache of catalog pages and searches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            max_entries: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl CliConfig {
    /// Load configuration. An explicit path must exist; the implicit files are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match explicit {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(user_file) = Self::user_config_path() {
                    builder = builder.add_source(config::File::from(user_file).required(false));
                }
                builder = builder
                    .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false));
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// `<config dir>/partmatch/config.toml` for the current platform
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "partmatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::error::PartMatchError::Other(format!("Failed to render config: {}", e)))
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.catalog.request_delay_ms)
    }
}
