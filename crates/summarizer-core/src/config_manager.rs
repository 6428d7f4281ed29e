use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for the summarizer service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SummarizerConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote assistant provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Run status polling
    #[serde(default)]
    pub polling: PollingConfig,

    /// Form validation limits
    #[serde(default)]
    pub form: FormConfig,

    /// What gets deleted once a request finishes
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on the multipart request body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Assistants API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    // Never written back to disk; comes from the config file or OPENAI_API_KEY.
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Base URL for API (default: https://api.openai.com/v1)
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model the assistant is created with
    #[serde(default = "default_model")]
    pub model: String,

    /// Display name of the assistants created per request
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// Optional system instructions for the assistant
    #[serde(default)]
    pub instructions: Option<String>,

    /// Optional organization ID
    #[serde(default)]
    pub organization: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_model(),
            assistant_name: default_assistant_name(),
            instructions: None,
            organization: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Maximum number of run status checks
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between status checks
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Prompts must be strictly shorter than this many UTF-16 code units
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

/// Which remote resources are removed after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CleanupScope {
    /// Delete every assistant and every file stored under the account
    #[default]
    Account,
    /// Delete only the assistant and file created by the request
    Request,
}

impl fmt::Display for CleanupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupScope::Account => write!(f, "account"),
            CleanupScope::Request => write!(f, "request"),
        }
    }
}

impl FromStr for CleanupScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "account" => Ok(CleanupScope::Account),
            "request" => Ok(CleanupScope::Request),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid cleanup scope: {}. Must be one of: account, request",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CleanupConfig {
    #[serde(default)]
    pub scope: CleanupScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo-0125".to_string()
}
fn default_assistant_name() -> String {
    "File summarizer".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_attempts() -> u32 {
    20
}
fn default_interval_ms() -> u64 {
    1000
}
fn default_max_prompt_chars() -> usize {
    200
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager: file, `.env` and environment layered over defaults
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: SummarizerConfig,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.summarizer.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading summarizer configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Self::validate_config(&config)?;

        Self::log_summary(&config, config_path.as_deref());

        Ok(Self { config })
    }

    /// Load an explicit config file, then apply environment overrides
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        Self::load_dotenv();

        let config = Self::read_toml_file(path)?;
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Self::validate_config(&config)?;

        Self::log_summary(&config, Some(path));

        Ok(Self { config })
    }

    /// Wrap an in-memory configuration without touching the environment
    pub fn from_config(config: SummarizerConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self { config })
    }

    fn log_summary(config: &SummarizerConfig, path: Option<&Path>) {
        info!("Configuration loaded successfully");
        match path {
            Some(path) => info!("   Config file: {}", path.display()),
            None => info!("   Config file: NONE (using defaults)"),
        }
        info!("   Listen address: {}:{}", config.server.host, config.server.port);
        info!("   Assistants API: {}", config.openai.base_url);
        info!("   Model: {}", config.openai.model);
        info!(
            "   Polling: {} attempts every {}ms",
            config.polling.max_attempts, config.polling.interval_ms
        );
        info!("   Cleanup scope: {}", config.cleanup.scope);
        if config.openai.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; summarization requests will fail");
        }
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".summarizer.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .summarizer.env: {}", e);
                } else {
                    info!("Loaded .summarizer.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.summarizer.toml (current directory)
    /// 2. ~/.summarizer/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(SummarizerConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".summarizer.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".summarizer").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((SummarizerConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<SummarizerConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides read through `lookup`
    pub fn apply_env_overrides<F>(mut config: SummarizerConfig, lookup: F) -> SummarizerConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                config.openai.api_key = Some(SecretString::from(key));
            }
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.openai.base_url = url;
        }
        if let Some(org) = lookup("OPENAI_ORG_ID") {
            config.openai.organization = Some(org);
        }
        if let Some(model) = lookup("SUMMARIZER_MODEL") {
            config.openai.model = model;
        }
        if let Some(host) = lookup("SUMMARIZER_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("SUMMARIZER_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!("Ignoring invalid SUMMARIZER_PORT: {}", port),
            }
        }
        if let Some(attempts) = lookup("SUMMARIZER_POLL_ATTEMPTS") {
            match attempts.parse() {
                Ok(attempts) => config.polling.max_attempts = attempts,
                Err(_) => warn!("Ignoring invalid SUMMARIZER_POLL_ATTEMPTS: {}", attempts),
            }
        }
        if let Some(interval) = lookup("SUMMARIZER_POLL_INTERVAL_MS") {
            match interval.parse() {
                Ok(ms) => config.polling.interval_ms = ms,
                Err(_) => warn!("Ignoring invalid SUMMARIZER_POLL_INTERVAL_MS: {}", interval),
            }
        }
        if let Some(scope) = lookup("SUMMARIZER_CLEANUP_SCOPE") {
            match scope.parse() {
                Ok(scope) => config.cleanup.scope = scope,
                Err(e) => warn!("Ignoring SUMMARIZER_CLEANUP_SCOPE: {}", e),
            }
        }
        if let Some(level) = lookup("RUST_LOG") {
            // Only plain levels map onto the config; filter directives go straight to EnvFilter.
            if is_log_level(&level) {
                config.logging.level = level;
            }
        }
        if let Some(format) = lookup("SUMMARIZER_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }

    /// Validate configuration
    pub fn validate_config(config: &SummarizerConfig) -> Result<(), ConfigError> {
        if config.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host cannot be empty".to_string(),
            ));
        }
        if config.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be > 0".to_string(),
            ));
        }
        if config.server.max_upload_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_upload_bytes must be > 0".to_string(),
            ));
        }
        if config.openai.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "openai.base_url cannot be empty".to_string(),
            ));
        }
        if config.openai.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "openai.model cannot be empty".to_string(),
            ));
        }
        if config.polling.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "polling.max_attempts must be > 0".to_string(),
            ));
        }
        if config.form.max_prompt_chars == 0 {
            return Err(ConfigError::ValidationError(
                "form.max_prompt_chars must be > 0".to_string(),
            ));
        }

        if !is_log_level(&config.logging.level) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                config.logging.level
            )));
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = SummarizerConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

fn is_log_level(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}
