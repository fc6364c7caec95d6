//! TOML configuration for LogSentinel.
//!
//! Layered: an explicit path, then the `LOGSENTINEL_CONFIG` environment
//! variable, then `./logsentinel.toml`, then compiled-in defaults. A few
//! environment variables override individual settings after loading.

use std::path::{Path, PathBuf};

use crate::classify::FallbackPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "LOGSENTINEL_CONFIG";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DB_PATH_ENV: &str = "LOGSENTINEL_DB";
pub const BIND_ENV: &str = "LOGSENTINEL_BIND";
const LOCAL_CONFIG: &str = "logsentinel.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration, passed explicitly to everything that needs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub fallback: FallbackPolicy,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve configuration for a process. An explicit path must load; the
    /// implicit locations fall through to defaults. Logs nothing; call
    /// [`ResolvedConfig::log`] once the subscriber is installed.
    pub fn resolve(explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
        Self::resolve_with(
            explicit,
            std::env::var(CONFIG_ENV).ok().map(PathBuf::from),
            Path::new(LOCAL_CONFIG),
            |key| std::env::var(key).ok(),
        )
    }

    fn resolve_with<F>(
        explicit: Option<&Path>,
        env_path: Option<PathBuf>,
        local: &Path,
        lookup: F,
    ) -> Result<ResolvedConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut skipped = Vec::new();
        let (mut config, source) = match explicit {
            Some(path) => (Self::load(path)?, ConfigSource::File(path.to_path_buf())),
            None => {
                let candidates = env_path
                    .into_iter()
                    .chain(local.exists().then(|| local.to_path_buf()));
                let mut found = None;
                for path in candidates {
                    match Self::load(&path) {
                        Ok(cfg) => {
                            found = Some((cfg, ConfigSource::File(path)));
                            break;
                        }
                        Err(e) => skipped.push(e),
                    }
                }
                found.unwrap_or_else(|| (Self::default(), ConfigSource::Defaults))
            }
        };
        config.apply_env_overrides(lookup);
        Ok(ResolvedConfig {
            config,
            source,
            skipped,
        })
    }

    /// Apply environment overrides. `lookup` is injected so tests need not
    /// touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.classifier.api_key = Some(key);
        }
        if let Some(db) = lookup(DB_PATH_ENV).filter(|v| !v.is_empty()) {
            self.storage.db_path = PathBuf::from(db);
        }
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("compiled-in defaults"),
        }
    }
}

/// Outcome of [`AppConfig::resolve`], kept until logging is available.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub config: AppConfig,
    pub source: ConfigSource,
    /// Implicit config files that existed but could not be loaded.
    pub skipped: Vec<ConfigError>,
}

impl ResolvedConfig {
    pub fn log(&self) {
        for err in &self.skipped {
            warn!(error = %err, "skipping unusable config file");
        }
        info!(source = %self.source, "configuration resolved");
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8001".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. Parent directories are created on open.
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/logsentinel.db"),
        }
    }
}

/// Classification collaborator settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Upper bound on one classification exchange, in seconds.
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 60,
            temperature: 0.2,
        }
    }
}

// Keeps the key out of logs and panics.
impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory holding the PDF font files. Standard system locations are
    /// searched when unset.
    pub fonts_dir: Option<PathBuf>,
    pub font_family: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fonts_dir: None,
            font_family: "DejaVuSans".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
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
