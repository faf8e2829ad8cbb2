//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles file discovery,
//! environment detection, and layering of file and process overrides.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};

use super::catalog::Catalog;
use super::error::{ConfigResult, ConfigurationError};
use super::DistillConfig;
use crate::logging::get_environment;

const BASE_FILE: &str = "distill.yaml";
const ENVIRONMENTS_DIR: &str = "environments";
const DEFAULT_CATALOG_FILE: &str = "catalog.yaml";
const ENV_PREFIX: &str = "DISTILL";

/// Loaded configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: DistillConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = get_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    ///
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            broker = ?config.broker.provider,
            sweep_enabled = config.sweep.enabled,
            sweep_interval_seconds = config.sweep.interval_seconds,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (tests, embedding)
    pub fn from_config(
        config: DistillConfig,
        environment: &str,
        config_directory: PathBuf,
    ) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    pub fn config(&self) -> &DistillConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Resolved location of the administrative catalog
    pub fn catalog_path(&self) -> PathBuf {
        match &self.config.catalog_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.config_directory.join(path),
            None => self.config_directory.join(DEFAULT_CATALOG_FILE),
        }
    }

    /// Load and validate the administrative catalog
    pub fn load_catalog(&self) -> ConfigResult<Catalog> {
        Catalog::load(&self.catalog_path())
    }

    fn default_config_directory() -> PathBuf {
        env::var("DISTILL_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<DistillConfig> {
        let base_path = config_directory.join(BASE_FILE);
        if !base_path.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![base_path]));
        }

        let override_path = config_directory
            .join(ENVIRONMENTS_DIR)
            .join(format!("{environment}.yaml"));
        if override_path.is_file() {
            debug!(path = %override_path.display(), "Applying environment overrides");
        }

        let settings = Config::builder()
            .add_source(File::from(base_path.clone()).format(FileFormat::Yaml))
            .add_source(
                File::from(override_path)
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_failed(base_path.display().to_string(), e))?;

        settings
            .try_deserialize::<DistillConfig>()
            .map_err(|e| ConfigurationError::deserialization_failed("distill configuration", e))
    }
}
