//! Bootstrap configuration loading
//!
//! The TOML file holds everything the pipeline needs before the database is
//! open: database path, bind address, logging, external service endpoints and
//! worker tuning. Every field has a built-in default so a missing file is not
//! an error.
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `~/.config/lokvaani/config.toml`, then `/etc/lokvaani/config.toml`
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LOKVAANI_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP bind address (host:port)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub services: ServiceEndpoints,

    #[serde(default)]
    pub workers: WorkerSettings,

    #[serde(default)]
    pub broadcast: BroadcastSettings,

    #[serde(default)]
    pub agent: AgentSettings,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: default_bind_addr(),
            logging: LoggingConfig::default(),
            services: ServiceEndpoints::default(),
            workers: WorkerSettings::default(),
            broadcast: BroadcastSettings::default(),
            agent: AgentSettings::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (e.g. "info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Base URLs of the external enrichment services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    /// Comment generator (POST {url}/generate)
    #[serde(default = "default_generator_url")]
    pub generator_url: String,
    /// Sentiment/translation analyzer (POST {url}/analyze)
    #[serde(default = "default_analyzer_url")]
    pub analyzer_url: String,
    /// Embedding service (POST {url}/embed)
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,
    /// Grounded answer generation (POST {url}/generate)
    #[serde(default = "default_answer_url")]
    pub answer_url: String,
    /// Category narrative summarizer (POST {url}/summarize)
    #[serde(default = "default_summarizer_url")]
    pub summarizer_url: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            generator_url: default_generator_url(),
            analyzer_url: default_analyzer_url(),
            embedding_url: default_embedding_url(),
            answer_url: default_answer_url(),
            summarizer_url: default_summarizer_url(),
        }
    }
}

/// Ingestion and analysis worker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub ingestion_interval_secs: u64,
    pub analysis_interval_secs: u64,
    /// Generator slots filled per ingestion run
    pub comments_per_run: usize,
    pub generator_max_attempts: u32,
    pub generator_timeout_secs: u64,
    /// Pause between generator attempts (0 retries immediately)
    pub generator_backoff_ms: u64,
    /// Comments claimed per analysis run
    pub analysis_batch_size: usize,
    /// Transient analyzer failures tolerated before a comment is quarantined
    pub max_processing_attempts: i64,
    pub analyzer_timeout_secs: u64,
    /// Age after which a PROCESSING claim is considered abandoned
    pub lease_timeout_secs: u64,
    pub health_interval_secs: u64,
    /// How long manual submissions wait for analysis
    pub intake_timeout_secs: u64,
    pub summarizer_timeout_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            ingestion_interval_secs: 60,
            analysis_interval_secs: 60,
            comments_per_run: 3,
            generator_max_attempts: 3,
            generator_timeout_secs: 15,
            generator_backoff_ms: 0,
            analysis_batch_size: 3,
            max_processing_attempts: 3,
            analyzer_timeout_secs: 60,
            lease_timeout_secs: 300,
            health_interval_secs: 3600,
            intake_timeout_secs: 60,
            summarizer_timeout_secs: 600,
        }
    }
}

/// Realtime broadcast tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    pub interval_secs: u64,
    /// Events buffered per subscriber before it is reported as lagged
    pub channel_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            channel_capacity: 100,
        }
    }
}

/// Retrieval-augmented query tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Windows at or below this trimmed length are discarded
    pub min_chunk_chars: usize,
    /// Texts are truncated to this many chars before embedding
    pub embed_max_chars: usize,
    pub chunk_delay_ms: u64,
    pub comment_batch_size: usize,
    pub batch_delay_ms: u64,
    pub comment_sync_limit: i64,
    pub top_k_chunks: usize,
    pub top_k_comments: usize,
    pub embeddings_per_second: u32,
    pub embedding_timeout_secs: u64,
    pub answer_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
            min_chunk_chars: 50,
            embed_max_chars: 2000,
            chunk_delay_ms: 300,
            comment_batch_size: 20,
            batch_delay_ms: 500,
            comment_sync_limit: 2000,
            top_k_chunks: 3,
            top_k_comments: 10,
            embeddings_per_second: 10,
            embedding_timeout_secs: 30,
            answer_timeout_secs: 120,
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lokvaani").join("lokvaani.db"))
        .unwrap_or_else(|| PathBuf::from("./lokvaani_data/lokvaani.db"))
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_generator_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_analyzer_url() -> String {
    "http://127.0.0.1:5002".to_string()
}

fn default_embedding_url() -> String {
    "http://127.0.0.1:5003".to_string()
}

fn default_answer_url() -> String {
    "http://127.0.0.1:5003".to_string()
}

fn default_summarizer_url() -> String {
    "http://127.0.0.1:5004".to_string()
}

/// Locate the config file following the documented priority order
///
/// Returns `None` when no file exists anywhere; callers fall back to
/// `TomlConfig::default()`.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("lokvaani").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/lokvaani/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve and load the bootstrap config, falling back to defaults
///
/// An explicitly named file (CLI or env) that fails to load is an error; the
/// implicit per-user/system locations are only used when present.
pub fn load_bootstrap_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
        Some(path) => {
            let config = load_toml_config(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        None => {
            warn!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write a config file (used by tests and first-run tooling)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            bind_addr = "0.0.0.0:9000"

            [workers]
            analysis_batch_size = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.workers.analysis_batch_size, 10);
        assert_eq!(config.workers.max_processing_attempts, 3);
        assert_eq!(config.broadcast.interval_secs, 15);
        assert_eq!(config.agent.chunk_size, 800);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_cli_arg_wins() {
        let path = resolve_config_path(Some(Path::new("/tmp/explicit.toml")), "LOKVAANI_UNSET_VAR");
        assert_eq!(path, Some(PathBuf::from("/tmp/explicit.toml")));
    }
}
