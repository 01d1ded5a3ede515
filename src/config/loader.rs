//! Configuration File Loading
//!
//! Finds the configuration file in the usual locations, falls back to
//! defaults when none exists, and validates the result.

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "RELEASE_VERIFY_CONFIG";

const CONFIG_FILE_NAME: &str = "release-verify.toml";

/// Configuration file loader
pub struct ConfigLoader {
    /// Candidate configuration files, in priority order
    search_paths: Vec<PathBuf>,
    /// Configuration file path (if one was loaded)
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Whether to fall back to the default config if none exists
    pub create_default: bool,
    /// Whether to validate configuration after loading
    pub validate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            create_default: true,
            validate: true,
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            search_paths: Self::get_search_paths(),
            current_path: None,
        }
    }

    /// Load configuration with default options
    pub fn load() -> Result<Config> {
        Self::new().load_with_options(LoadOptions::default())
    }

    /// Load configuration with custom options
    pub fn load_with_options(&mut self, options: LoadOptions) -> Result<Config> {
        let config = match self.find_config() {
            Some(path) => {
                let config = Self::load_from_path(&path)?;
                info!("Loaded configuration from {}", path.display());
                self.current_path = Some(path);
                config
            }
            None if options.create_default => {
                debug!("No configuration file found, using defaults");
                Config::default()
            }
            None => return Err(Error::ConfigNotFound),
        };

        let config = config.expand_paths();
        if options.validate {
            validate_config(&config)?;
        }
        Ok(config)
    }

    /// Load a specific configuration file
    pub fn load_from_path(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// First existing file among the search paths
    fn find_config(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|path| path.is_file()).cloned()
    }

    /// Get default search paths for configuration files
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(explicit) = env::var(CONFIG_ENV_VAR) {
            paths.push(PathBuf::from(explicit));
        }

        // Current working directory
        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("release-verify").join("config.toml"));
        }

        paths
    }

    /// Get the configuration file path (if one was loaded)
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// List all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Clear all search paths and add a single path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let paths = [
        ("paths.topdir", &config.paths.topdir),
        ("paths.prefix", &config.paths.prefix),
        ("paths.srcdir", &config.paths.srcdir),
        ("paths.installdir", &config.paths.installdir),
        ("paths.thirdpartdir", &config.paths.thirdpartdir),
    ];
    for (field, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: field.to_string(),
                reason: "Path cannot be empty".to_string(),
            });
        }
    }

    if config.remote.host.trim().is_empty() {
        return Err(Error::ConfigValidationFailed {
            field: "remote.host".to_string(),
            reason: "Host cannot be empty".to_string(),
        });
    }

    if config.admin.username.trim().is_empty() {
        return Err(Error::ConfigValidationFailed {
            field: "admin.username".to_string(),
            reason: "Admin username cannot be empty".to_string(),
        });
    }

    let timeout = config.orchestrator.prompt_timeout_secs;
    if timeout == 0 || timeout > 86400 {
        return Err(Error::ConfigValidationFailed {
            field: "orchestrator.prompt_timeout_secs".to_string(),
            reason: "Prompt timeout must be between 1 second and 24 hours".to_string(),
        });
    }

    if config.orchestrator.max_diagnostic_bytes == 0 {
        return Err(Error::ConfigValidationFailed {
            field: "orchestrator.max_diagnostic_bytes".to_string(),
            reason: "Diagnostic capture must be greater than 0".to_string(),
        });
    }

    if config.orchestrator.kill_grace_ms > 300_000 {
        return Err(Error::ConfigValidationFailed {
            field: "orchestrator.kill_grace_ms".to_string(),
            reason: "Kill grace period cannot exceed 5 minutes".to_string(),
        });
    }

    let (cols, rows) = config.orchestrator.dimensions;
    if cols == 0 || rows == 0 {
        return Err(Error::ConfigValidationFailed {
            field: "orchestrator.dimensions".to_string(),
            reason: "Terminal dimensions must be non-zero".to_string(),
        });
    }

    Ok(())
}
