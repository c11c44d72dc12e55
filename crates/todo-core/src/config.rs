//! Configuration for the todo service
//!
//! Values come from defaults, then an optional TOML file, then environment
//! variables, each layer overriding the previous one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "TODO_CONFIG";
/// Environment variable overriding the HTTP bind address
pub const ENV_BIND_ADDR: &str = "TODO_ADDR";
/// Environment variable selecting the store connection target
pub const ENV_DATABASE_URL: &str = "TODO_DATABASE_URL";
/// Environment variable selecting the storage backend (`memory` or `sqlite`)
pub const ENV_STORAGE: &str = "TODO_STORAGE";

/// Default store connection target, relative to the working directory
pub const DEFAULT_DATABASE_URL: &str = "todoapp.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Service-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: String,
    /// Base used for todo URLs when a request carries no `Host` header
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            public_base_url: None,
        }
    }
}

impl ServerConfig {
    /// Base URL derived from the configured base or the bind address
    pub fn fallback_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_addr))
    }
}

/// Which store adapter backs the repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// No persistence
    Memory,
    /// SQLite document store
    #[default]
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "none" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(ConfigError::InvalidValue {
                field: "storage.backend".to_string(),
                message: format!("unknown backend '{}'", other),
            }),
        }
    }
}

/// Store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Store connection target (database file path for SQLite)
    pub url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl TodoConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    /// Default per-user config file location (`<config_dir>/todo-server/config.toml`)
    pub fn standard_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("todo-server").join("config.toml"))
    }

    /// Load from the standard locations and the process environment.
    ///
    /// `$TODO_CONFIG` must point at a readable file if set; the per-user file
    /// is only read when it exists.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(ENV_CONFIG_PATH) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => match Self::standard_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::info!("Loading config from {}", path.display());
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment values, looked up through `lookup`
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.storage.url = url;
        }
        if let Some(backend) = lookup(ENV_STORAGE) {
            self.storage.backend = backend.parse()?;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.bind_addr".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.storage.backend == StorageBackend::Sqlite && self.storage.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.url".to_string(),
                message: "must not be empty for the sqlite backend".to_string(),
            });
        }

        Ok(())
    }
}
