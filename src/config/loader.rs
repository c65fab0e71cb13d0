//! Configuration File Loading
//!
//! Finds and parses the configuration file. Lookup order:
//!
//! 1. an explicit path (`--config`)
//! 2. `$KRNR_CONFIG`
//! 3. `<config dir>/krnr/config.toml`
//! 4. `<config dir>/krnr/config.json`
//! 5. built-in defaults

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "KRNR_CONFIG";

/// Configuration file loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Candidate files, most specific first
    search_paths: Vec<PathBuf>,
    /// File the last successful load came from
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Format implied by a file extension; TOML unless it says `.json`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}

impl ConfigLoader {
    /// Create a loader over the default search paths
    pub fn new() -> Self {
        Self::with_search_paths(Self::get_search_paths())
    }

    /// Create a loader over explicit candidate files
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            current_path: None,
        }
    }

    /// Load from `explicit` when given, otherwise search.
    pub fn resolve(explicit: Option<&Path>) -> Result<Config> {
        let mut loader = Self::new();
        match explicit {
            Some(path) => loader.load_from_path(path),
            None => loader.load(),
        }
    }

    /// Load the first configuration file found, or defaults if there is none.
    ///
    /// A file that exists but cannot be parsed or validated is an error
    /// rather than being skipped.
    pub fn load(&mut self) -> Result<Config> {
        match self.find_config() {
            Some(path) => self.load_from_path(&path),
            None => {
                debug!("No configuration file found, using defaults");
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load a specific configuration file
    pub fn load_from_path(&mut self, path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let config = Self::load_config_file(path, ConfigFormat::from_path(path))?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        self.current_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// File the last load came from, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn find_config(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.is_file()).cloned()
    }

    fn load_config_file(path: &Path, format: ConfigFormat) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| Error::ConfigParseFailed {
            format: format.name().to_string(),
            reason,
        })
    }

    /// Get default search paths for configuration files
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
            paths.push(PathBuf::from(path));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join("krnr");
            paths.push(dir.join("config.toml"));
            paths.push(dir.join("config.json"));
        }

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
