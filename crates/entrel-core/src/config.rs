//! entrel Configuration Management
//!
//! Handles configuration from environment variables and config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Extraction pipeline configuration
    pub extraction: ExtractionConfig,

    /// AWS Comprehend backend configuration
    pub aws: AwsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = parse_env("API_PORT", port)?;
        }
        if let Ok(size) = std::env::var("MAX_BODY_SIZE") {
            self.server.max_body_size = parse_env("MAX_BODY_SIZE", size)?;
        }

        // CORS origins from environment variable (comma-separated)
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Extraction
        if let Ok(mode) = std::env::var("EXTRACTION_MODE") {
            self.extraction.mode = mode.parse()?;
        }
        if let Ok(secs) = std::env::var("RECOGNITION_TIMEOUT_SECS") {
            self.extraction.recognition_timeout_secs = parse_env("RECOGNITION_TIMEOUT_SECS", secs)?;
        }
        if let Ok(len) = std::env::var("MAX_CONTENT_LENGTH") {
            self.extraction.max_content_length = parse_env("MAX_CONTENT_LENGTH", len)?;
        }

        // AWS
        if let Ok(region) = std::env::var("AWS_REGION") {
            self.aws.region = region;
        }
        if let Ok(endpoint) = std::env::var("COMPREHEND_ENDPOINT") {
            self.aws.endpoint = Some(endpoint);
        }
        if let Ok(key) = std::env::var("AWS_ACCESS_KEY_ID") {
            self.aws.access_key_id = Some(key);
        }
        if let Ok(secret) = std::env::var("AWS_SECRET_ACCESS_KEY") {
            self.aws.secret_access_key = Some(secret);
        }
        if let Ok(token) = std::env::var("AWS_SESSION_TOKEN") {
            self.aws.session_token = Some(token);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 60,
            max_body_size: 10 * 1024 * 1024, // 10MB
            cors_enabled: true,
            cors_origins: vec![],
        }
    }
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Which recognizer backend to use
    pub mode: ExtractionMode,

    /// Upper bound on a single recognition call
    pub recognition_timeout_secs: u64,

    /// Maximum accepted document length in bytes
    pub max_content_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::Local,
            recognition_timeout_secs: 30,
            max_content_length: 1_000_000,
        }
    }
}

/// Supported recognizer backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// In-process rule-based recognizer
    Local,
    /// AWS Comprehend DetectEntities
    Aws,
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Aws => write!(f, "aws"),
        }
    }
}

impl std::str::FromStr for ExtractionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "aws" | "comprehend" => Ok(Self::Aws),
            _ => Err(ConfigError::InvalidValue {
                key: "EXTRACTION_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// AWS Comprehend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// Endpoint override (defaults to the regional Comprehend endpoint)
    pub endpoint: Option<String>,

    /// Document language passed to Comprehend
    pub language_code: String,

    /// Access key ID
    pub access_key_id: Option<String>,

    /// Secret access key
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            language_code: "en".to_string(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

impl AwsConfig {
    /// Endpoint URL for the configured region
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://comprehend.{}.amazonaws.com", self.region))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for crate::EntrelError {
    fn from(err: ConfigError) -> Self {
        crate::EntrelError::ConfigError(err.to_string())
    }
}
