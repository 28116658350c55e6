//! Layered application configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory, or `--config PATH`
//! 3. `TIERDUPE_*` environment variables (e.g. `TIERDUPE_IO_THREADS=8`)
//! 4. Command-line flags, applied with [`Config::merge_scan_args`]
//!
//! A file or variable that fails to parse is reported with a warning and
//! the defaults are used instead.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogConfig;
use crate::cli::ScanArgs;
use crate::scanner::hasher::DEFAULT_MMAP_THRESHOLD;
use crate::scanner::{HashTier, WalkerConfig, PREHASH_SIZE};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TIERDUPE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Threads used to hash files within one tier.
    pub io_threads: usize,
    /// Leading bytes hashed by the quick tier.
    pub quick_sample_size: usize,
    /// Files at least this large are memory-mapped for full hashing.
    pub mmap_threshold: u64,
    /// Tier to compute and group by.
    pub tier: HashTier,
    /// Report files known to be unique as single-member groups.
    pub include_singletons: bool,
    /// How long `scan` waits for background hashing.
    pub wait_timeout_secs: u64,
    /// Follow symbolic links during the walk.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Ignore files smaller than this.
    pub min_size: Option<u64>,
    /// Ignore files larger than this.
    pub max_size: Option<u64>,
    /// Gitignore-style patterns to skip.
    pub ignore_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: 4,
            quick_sample_size: PREHASH_SIZE,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            tier: HashTier::Full,
            include_singletons: false,
            wait_timeout_secs: 600,
            follow_symlinks: false,
            skip_hidden: false,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
        }
    }
}

impl Config {
    /// Load from the default platform path plus environment.
    #[must_use]
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_path(path),
            None => {
                log::debug!("No platform config directory, using defaults and environment");
                Self::extract(Self::base_figment().merge(Env::prefixed(ENV_PREFIX)))
            }
        }
    }

    /// Load from `path` (if it exists) plus environment.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut figment = Self::base_figment();
        if path.exists() {
            log::debug!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        } else {
            log::debug!("Config file {} not found", path.display());
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    fn extract(figment: Figment) -> Self {
        match figment.extract::<Self>() {
            Ok(config) => config.validated(),
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Clamp values that would make hashing impossible.
    fn validated(mut self) -> Self {
        if self.io_threads == 0 {
            log::warn!("io_threads must be at least 1, using 1");
            self.io_threads = 1;
        }
        if self.quick_sample_size == 0 {
            log::warn!("quick_sample_size must be at least 1, using 1");
            self.quick_sample_size = 1;
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                log::warn!("min_size {} exceeds max_size {}, ignoring both", min, max);
                self.min_size = None;
                self.max_size = None;
            }
        }
        self
    }

    /// Platform-specific path of `config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tierdupe").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply flags given on the command line.
    pub fn merge_scan_args(&mut self, args: &ScanArgs) {
        if let Some(tier) = args.tier {
            self.tier = tier.into();
        }
        if let Some(threads) = args.io_threads {
            self.io_threads = threads;
        }
        if let Some(bytes) = args.quick_bytes {
            self.quick_sample_size = usize::try_from(bytes).unwrap_or(usize::MAX);
        }
        if let Some(secs) = args.timeout {
            self.wait_timeout_secs = secs;
        }
        if args.min_size.is_some() {
            self.min_size = args.min_size;
        }
        if args.max_size.is_some() {
            self.max_size = args.max_size;
        }
        self.include_singletons |= args.include_singletons;
        self.follow_symlinks |= args.follow_symlinks;
        self.skip_hidden |= args.skip_hidden;
        self.ignore_patterns.extend(args.ignore_patterns.iter().cloned());

        *self = std::mem::take(self).validated();
    }

    /// Walker settings derived from this configuration.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            min_size: self.min_size,
            max_size: self.max_size,
            ignore_patterns: self.ignore_patterns.clone(),
        }
    }

    /// Catalog settings derived from this configuration.
    #[must_use]
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig::default()
            .with_io_threads(self.io_threads)
            .with_quick_sample_size(self.quick_sample_size)
            .with_mmap_threshold(self.mmap_threshold)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Write as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.io_threads, 4);
        assert_eq!(config.quick_sample_size, 4096);
        assert_eq!(config.mmap_threshold, 64 * 1024 * 1024);
        assert_eq!(config.tier, HashTier::Full);
        assert_eq!(config.wait_timeout_secs, 600);
        assert!(!config.include_singletons);
    }

    #[test]
    fn test_validated_clamps() {
        let config = Config {
            io_threads: 0,
            quick_sample_size: 0,
            min_size: Some(10),
            max_size: Some(5),
            ..Config::default()
        }
        .validated();
        assert_eq!(config.io_threads, 1);
        assert_eq!(config.quick_sample_size, 1);
        assert_eq!(config.min_size, None);
        assert_eq!(config.max_size, None);
    }

    #[test]
    fn test_toml_round_trip_through_figment() {
        let config = Config {
            tier: HashTier::Quick,
            ignore_patterns: vec!["*.bak".to_string()],
            min_size: Some(1),
            ..Config::default()
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("tier = \"quick\""));

        let parsed: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(&text))
            .extract()
            .unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_catalog_config_carries_values() {
        let config = Config {
            io_threads: 2,
            quick_sample_size: 128,
            ..Config::default()
        };
        let catalog = config.catalog_config();
        assert_eq!(catalog.io_threads, 2);
        assert_eq!(catalog.quick_sample_size, 128);
    }
}
