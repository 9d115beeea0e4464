use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CodefixError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "codefix.toml";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

/// Top-level service settings.
///
/// Sources are layered: serde defaults, then a TOML file, then `CODEFIX_*`
/// environment variables (`__` separates sections, e.g. `CODEFIX_SERVER__PORT`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub scanner: ScannerConfig,
    pub ai: AiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Which identity scheme backs projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Rich records kept as JSON documents in SQLite.
    Sqlite,
    /// Rich records kept in process memory. Lost on restart.
    Memory,
    /// No records; each directory under the repositories root is a project.
    Directory,
}

/// What `acquire` does when the slot for a repository name is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquirePolicy {
    /// Delete the previous clone, then clone again. Last clone wins.
    Replace,
    /// Refuse to touch an existing slot.
    FailIfExists,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub repositories_root: PathBuf,
    pub database_path: PathBuf,
    pub acquire_policy: AcquirePolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            repositories_root: PathBuf::from("repos"),
            database_path: PathBuf::from("codefix.db"),
            acquire_policy: AcquirePolicy::Replace,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub follow_symlinks: bool,
    pub skip_dirs: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_dirs: vec![".git".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Transport timeout. `None` leaves the client default in place.
    pub timeout_seconds: Option<u64>,
    /// Largest file accepted for analysis. `None` means unlimited.
    pub max_content_bytes: Option<usize>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_seconds: None,
            max_content_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or the default locations) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
            }
            None => {
                if let Some(path) = Self::default_config_path() {
                    debug!(path = %path.display(), "Loading default configuration file");
                    builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("CODEFIX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.apply_legacy_env();
        settings.validate()?;
        Ok(settings)
    }

    /// `./codefix.toml` if present, else the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("dev", "codefix", "codefix")
            .map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
    }

    // `PORT` and `GEMINI_API_KEY` are what hosted deployments already set.
    fn apply_legacy_env(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if self.ai.api_key.is_none() {
            self.ai.api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.repositories_root.as_os_str().is_empty() {
            return Err(CodefixError::Config("storage.repositories_root must not be empty".to_string()));
        }
        if self.ai.model.trim().is_empty() {
            return Err(CodefixError::Config("ai.model must not be empty".to_string()));
        }
        if self.ai.base_url.trim().is_empty() {
            return Err(CodefixError::Config("ai.base_url must not be empty".to_string()));
        }
        if self.ai.max_content_bytes == Some(0) {
            return Err(CodefixError::Config("ai.max_content_bytes must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
