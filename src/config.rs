use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

/// Smallest outbound queue that fits one broadcast plus its score message.
pub const MIN_SESSION_QUEUE_CAPACITY: usize = 2;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated ("*" for any)
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path of the persisted bitfield
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Directory with static assets served on unmatched routes
    pub static_dir: Option<String>,

    // Broadcast and persistence periods
    #[serde(default = "default_diff_interval_ms")]
    pub diff_interval_ms: u64,
    #[serde(default = "default_full_state_interval_ms")]
    pub full_state_interval_ms: u64,
    #[serde(default = "default_persist_interval_ms")]
    pub persist_interval_ms: u64,

    /// Minimum time between two accepted flips of one session
    #[serde(default = "default_min_flip_interval_ms")]
    pub min_flip_interval_ms: u64,

    // Penalty applied to a session that flips too fast
    #[serde(default = "default_penalty_min_ms")]
    pub penalty_min_ms: u64,
    #[serde(default = "default_penalty_max_ms")]
    pub penalty_max_ms: u64,

    /// Outbound messages buffered per session before it is dropped
    #[serde(default = "default_session_queue_capacity")]
    pub session_queue_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        let config = match envy::from_env::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                return Err(ConfigError::EnvError(e));
            }
        };

        config.validate()?;
        info!("✅ Configuration loaded successfully");
        Ok(config)
    }

    /// Reject values the periodic tasks and the rate limiter cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diff_interval_ms == 0 || self.full_state_interval_ms == 0 || self.persist_interval_ms == 0 {
            return Err(ConfigError::Invalid("broadcast and persistence intervals must be non-zero".to_string()));
        }
        if self.penalty_min_ms > self.penalty_max_ms {
            return Err(ConfigError::Invalid(format!(
                "penalty range is empty ({}ms > {}ms)",
                self.penalty_min_ms, self.penalty_max_ms
            )));
        }
        // Every broadcast queues two messages per session: the payload and its score
        if self.session_queue_capacity < MIN_SESSION_QUEUE_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "session queue capacity must be at least {} (got {})",
                MIN_SESSION_QUEUE_CAPACITY, self.session_queue_capacity
            )));
        }
        Ok(())
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn diff_interval(&self) -> Duration {
        Duration::from_millis(self.diff_interval_ms)
    }

    pub fn full_state_interval(&self) -> Duration {
        Duration::from_millis(self.full_state_interval_ms)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.persist_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            state_file: default_state_file(),
            static_dir: None,
            diff_interval_ms: default_diff_interval_ms(),
            full_state_interval_ms: default_full_state_interval_ms(),
            persist_interval_ms: default_persist_interval_ms(),
            min_flip_interval_ms: default_min_flip_interval_ms(),
            penalty_min_ms: default_penalty_min_ms(),
            penalty_max_ms: default_penalty_max_ms(),
            session_queue_capacity: default_session_queue_capacity(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8008
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_state_file() -> String {
    "bitfield.dat".to_string()
}

fn default_diff_interval_ms() -> u64 {
    333
}

fn default_full_state_interval_ms() -> u64 {
    30_000
}

fn default_persist_interval_ms() -> u64 {
    60_000
}

fn default_min_flip_interval_ms() -> u64 {
    50
}

fn default_penalty_min_ms() -> u64 {
    500
}

fn default_penalty_max_ms() -> u64 {
    700
}

fn default_session_queue_capacity() -> usize {
    64
}
