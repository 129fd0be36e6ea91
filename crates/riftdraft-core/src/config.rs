// Configuration loading and parsing (assistant.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub ai: AiConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub draft: DraftConfig,
    pub credentials: CredentialsConfig,
    pub db_path: String,
}

impl Config {
    /// Resolve the database location. An empty `[database] path` means the
    /// platform data directory (e.g. `~/.local/share/riftdraft`).
    pub fn resolved_db_path(&self) -> PathBuf {
        if !self.db_path.is_empty() {
            return PathBuf::from(&self.db_path);
        }
        directories::ProjectDirs::from("gg", "riftdraft", "riftdraft")
            .map(|dirs| dirs.data_dir().join("riftdraft.db"))
            .unwrap_or_else(|| PathBuf::from("riftdraft.db"))
    }
}

// ---------------------------------------------------------------------------
// assistant.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire assistant.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AssistantFile {
    ai: AiConfig,
    retry: RetryConfig,
    cache: CacheConfig,
    draft: DraftConfig,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub analysis_debounce_ms: u64,
}

impl AiConfig {
    pub fn analysis_debounce(&self) -> Duration {
        Duration::from_millis(self.analysis_debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub data_version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    /// `"competitive"` or `"solo_queue"`.
    pub mode: String,
    /// `"blue"` or `"red"`.
    pub user_side: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub gemini_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/assistant.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()` for normal startup.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let assistant_path = config_dir.join("assistant.toml");
    let assistant_text = read_file(&assistant_path)?;
    let file: AssistantFile =
        toml::from_str(&assistant_text).map_err(|e| ConfigError::ParseError {
            path: assistant_path.clone(),
            source: e,
        })?;

    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        ai: file.ai,
        retry: file.retry,
        cache: file.cache,
        draft: file.draft,
        credentials,
        db_path: file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Files seeded from `defaults/`. `credentials.toml` is optional and only
/// ever written by the user, starting from `credentials.toml.example`.
const SEEDED_FILES: &[&str] = &["assistant.toml"];

/// Copy any seeded config file missing from `config/` out of `defaults/`.
/// Returns the files written; an existing file is never overwritten.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    let copy_error = |message: String| ConfigError::DefaultsCopyError { message };

    let mut copied = Vec::new();
    for name in SEEDED_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(copy_error(format!(
                "{name} is in neither config/ nor defaults/ under {}",
                base_dir.display()
            )));
        }
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| copy_error(format!("failed to create {}: {e}", config_dir.display())))?;
        std::fs::copy(&source, &target)
            .map_err(|e| copy_error(format!("failed to copy {name}: {e}")))?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.ai.model.trim().is_empty() {
        return Err(invalid("ai.model", "must not be empty"));
    }
    if config.ai.max_output_tokens == 0 {
        return Err(invalid("ai.max_output_tokens", "must be greater than 0"));
    }
    if config.ai.analysis_debounce_ms == 0 {
        return Err(invalid("ai.analysis_debounce_ms", "must be greater than 0"));
    }
    if config.retry.base_delay_ms == 0 {
        return Err(invalid("retry.base_delay_ms", "must be greater than 0"));
    }
    if config.cache.ttl_secs == 0 {
        return Err(invalid("cache.ttl_secs", "must be greater than 0"));
    }
    if config.cache.data_version.trim().is_empty() {
        return Err(invalid("cache.data_version", "must not be empty"));
    }

    match config.draft.mode.as_str() {
        "competitive" | "solo_queue" => {}
        other => {
            return Err(invalid(
                "draft.mode",
                format!("expected \"competitive\" or \"solo_queue\", got \"{other}\""),
            ))
        }
    }
    match config.draft.user_side.as_str() {
        "blue" | "red" => {}
        other => {
            return Err(invalid(
                "draft.user_side",
                format!("expected \"blue\" or \"red\", got \"{other}\""),
            ))
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
