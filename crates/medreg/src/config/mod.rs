use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    /// Whether error responses may carry internal detail.
    pub fn exposes_error_detail(self) -> bool {
        !matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            uploads: UploadConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Ceilings applied to inbound file uploads.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Per-file ceiling for documents embedded in the registration form.
    pub form_file_limit_bytes: usize,
    /// Per-file ceiling for the standalone document endpoints.
    pub document_file_limit_bytes: usize,
    /// Maximum number of files accepted by the batch upload endpoint.
    pub max_batch_files: usize,
    /// Combined request-body ceiling for multipart submissions.
    pub body_limit_bytes: usize,
}

const DEFAULT_FORM_FILE_LIMIT: usize = 5 * 1024 * 1024;
const DEFAULT_DOCUMENT_FILE_LIMIT: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_BATCH_FILES: usize = 5;
const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

impl UploadConfig {
    fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            form_file_limit_bytes: read_limit("APP_FORM_FILE_LIMIT_BYTES", DEFAULT_FORM_FILE_LIMIT)?,
            document_file_limit_bytes: read_limit(
                "APP_DOCUMENT_FILE_LIMIT_BYTES",
                DEFAULT_DOCUMENT_FILE_LIMIT,
            )?,
            max_batch_files: read_limit("APP_MAX_BATCH_FILES", DEFAULT_MAX_BATCH_FILES)?,
            body_limit_bytes: read_limit("APP_BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT)?,
        })
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            form_file_limit_bytes: DEFAULT_FORM_FILE_LIMIT,
            document_file_limit_bytes: DEFAULT_DOCUMENT_FILE_LIMIT,
            max_batch_files: DEFAULT_MAX_BATCH_FILES,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

fn read_limit(variable: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(ConfigError::InvalidLimit { variable }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLimit { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLimit { variable } => {
                write!(f, "{variable} must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidLimit { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
