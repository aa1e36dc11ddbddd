//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Hierarchy resolver cache bounds.
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    /// Snapshot locations for the repair tooling.
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the closing guard reads the unapproved record count from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosingCountSource {
    /// Trust the maintained counter (O(1)).
    #[default]
    Stored,
    /// Recount descendants before deciding (O(n), repairs drift).
    Recount,
}

/// Ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Count source consulted before closing an account or period.
    #[serde(default)]
    pub closing_count_source: ClosingCountSource,
}

/// Hierarchy resolver cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyConfig {
    /// Maximum number of cached lineages.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Time-to-live of a cached lineage in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

/// Snapshot file locations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot to load.
    pub input: Option<PathBuf>,
    /// Where to write the repaired snapshot (stdout when unset).
    pub output: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "kassa=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("KASSA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
